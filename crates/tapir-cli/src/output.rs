//! Terminal output helpers.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, ContentArrangement, Table};
use owo_colors::{OwoColorize, Stream};
use tapir_core::ResolvedPackage;

/// Print an error message to stderr.
pub fn error(message: &str) {
    eprintln!(
        "{} {message}",
        "error:".if_supports_color(Stream::Stderr, |t| t.red().bold().to_string())
    );
}

/// Print a success message.
pub fn success(message: &str) {
    println!(
        "{}",
        message.if_supports_color(Stream::Stdout, |t| t.green().bold().to_string())
    );
}

/// Print an informational message.
pub fn info(message: &str) {
    println!(
        "{}",
        message.if_supports_color(Stream::Stdout, |t| t.cyan().to_string())
    );
}

/// Table of selected packages, one row per package.
pub fn package_table(packages: &[ResolvedPackage]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(["Package", "Version", "Architecture", "OS"]);

    for package in packages {
        let os = if package.os.is_empty() { "any" } else { package.os.as_str() };
        table.add_row([
            Cell::new(&package.name),
            Cell::new(&package.version),
            Cell::new(package.architecture),
            Cell::new(os),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use tapir_core::{CpuArchitecture, SemanticVersion};

    fn package(name: &str, version: SemanticVersion) -> ResolvedPackage {
        ResolvedPackage {
            name: name.to_string(),
            version,
            architecture: CpuArchitecture::Unspecified,
            os: String::new(),
        }
    }

    #[test]
    fn table_lists_every_package() {
        let packages = [
            package("Demonstration", SemanticVersion::new(9, 1, 0)),
            package("OpenTAP", SemanticVersion::new(9, 12, 0)),
        ];
        let rendered = package_table(&packages).to_string();
        assert!(rendered.contains("Demonstration"));
        assert!(rendered.contains("9.12.0"));
        assert!(rendered.contains("any"));
    }
}
