//! Tables printed by the `check`, `paths` and `status` commands.

use std::path::Path;

use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use ttu_updater::{Fixup, PlatformProfile, UpdateStatus, VersionCheck};

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

pub fn profile_table(profile: &PlatformProfile) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Item"), header_cell("Location")]);
    apply_table_style(&mut table);
    table.add_row(vec![
        Cell::new("Platform"),
        Cell::new(profile.platform.display_name()),
    ]);
    table.add_row(vec![Cell::new("Archive URL"), Cell::new(&profile.archive_url)]);
    table.add_row(path_row("Install directory", &profile.install_base_dir));
    table.add_row(path_row("Executable", &profile.executable_path));
    table.add_row(path_row("Version file", &profile.version_file_path));
    table.add_row(path_row("Archive file", &profile.archive_file_path));
    table.add_row(path_row("Status file", &profile.status_file_path));
    for fixup in &profile.post_extract_fixups {
        match fixup {
            Fixup::SetMode { path, mode } => table.add_row(vec![
                Cell::new(format!("Fixup (mode {mode:o})")),
                Cell::new(path.display()),
            ]),
        };
    }
    table
}

pub fn check_table(check: &VersionCheck) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Published"),
        header_cell("Installed"),
        header_cell("Update"),
    ]);
    apply_table_style(&mut table);
    let installed = match &check.local {
        Some(marker) => Cell::new(marker.display_short()),
        None => dim_cell("none"),
    };
    let update = if check.stale {
        Cell::new("available")
            .fg(Color::Yellow)
            .add_attribute(Attribute::Bold)
    } else {
        Cell::new("up to date").fg(Color::Green)
    };
    table.add_row(vec![Cell::new(check.remote.display_short()), installed, update]);
    table
}

pub fn status_table(status: &UpdateStatus) -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Field"), header_cell("Value")]);
    apply_table_style(&mut table);
    let outcome = if status.success {
        Cell::new("installed").fg(Color::Green)
    } else {
        Cell::new("failed").fg(Color::Red).add_attribute(Attribute::Bold)
    };
    table.add_row(vec![Cell::new("Outcome"), outcome]);
    table.add_row(vec![Cell::new("Version"), Cell::new(&status.version)]);
    table.add_row(vec![
        Cell::new("Previous version"),
        status
            .previous_version
            .as_deref()
            .map_or_else(|| dim_cell("none"), Cell::new),
    ]);
    table.add_row(vec![
        Cell::new("Finished"),
        Cell::new(status.timestamp.format("%Y-%m-%d %H:%M:%S UTC")),
    ]);
    if let Some(error) = &status.error {
        table.add_row(vec![Cell::new("Error"), Cell::new(error).fg(Color::Red)]);
    }
    table
}

fn path_row(label: &str, path: &Path) -> Vec<Cell> {
    let value = if path.exists() {
        Cell::new(path.display())
    } else {
        Cell::new(format!("{} (missing)", path.display())).fg(Color::DarkGrey)
    };
    vec![Cell::new(label), value]
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}

#[cfg(test)]
mod tests {
    use ttu_updater::{LauncherError, LauncherSettings, Platform, VersionMarker};

    use super::*;

    fn unwrapped(mut table: Table) -> String {
        table.set_content_arrangement(ContentArrangement::Disabled);
        table.to_string()
    }

    #[test]
    fn test_profile_table_lists_paths() {
        let temp = tempfile::tempdir().unwrap();
        let settings = LauncherSettings::default();
        let profile =
            PlatformProfile::resolve_in(Platform::MacOs, temp.path(), &settings).unwrap();

        let rendered = unwrapped(profile_table(&profile));

        assert!(rendered.contains("macOS"));
        assert!(rendered.contains("macos.zip"));
        assert!(rendered.contains("(missing)"));
        assert!(rendered.contains("Fixup (mode 755)"));
    }

    #[test]
    fn test_check_table_marks_update() {
        let check = VersionCheck {
            remote: VersionMarker::from("v2"),
            local: None,
            stale: true,
        };
        let rendered = unwrapped(check_table(&check));
        assert!(rendered.contains("available"));
        assert!(rendered.contains("none"));
    }

    #[test]
    fn test_status_table_shows_error() {
        let status = UpdateStatus::failure(
            &VersionMarker::from("v2"),
            Some(&VersionMarker::from("v1")),
            &LauncherError::Download("truncated".to_string()),
        );
        let rendered = unwrapped(status_table(&status));
        assert!(rendered.contains("failed"));
        assert!(rendered.contains("truncated"));
    }
}
