//! Rendering of check results.

use serde::Serialize;

use crate::check::{CheckEntry, Missing};

/// Format entries as an aligned table.
///
/// ```text
/// COMPONENT  VERSION STATUS     ERROR
/// test.de/x  v1      Incomplete
/// ```
///
/// The wide form adds a `MISSING` column listing each missing version with
/// the path that required it.
pub fn format_table(entries: &[CheckEntry], wide: bool) -> String {
    let mut headers = vec!["COMPONENT", "VERSION", "STATUS", "ERROR"];
    if wide {
        headers.push("MISSING");
    }

    let rows: Vec<Vec<String>> = entries
        .iter()
        .map(|e| {
            let mut row = vec![
                e.component_version.name().to_string(),
                e.component_version.version().to_string(),
                e.status.clone(),
                e.error.clone().unwrap_or_default(),
            ];
            if wide {
                row.push(format_missing(&e.result.missing));
            }
            row
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.len()).collect();
    for row in &rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.len());
        }
    }

    let mut out = String::new();
    push_row(&mut out, headers.iter().map(|h| h.to_string()), &widths);
    for row in rows {
        push_row(&mut out, row.into_iter(), &widths);
    }
    out
}

fn push_row(out: &mut String, cells: impl Iterator<Item = String>, widths: &[usize]) {
    let mut line = String::new();
    for (cell, width) in cells.zip(widths) {
        line.push_str(&format!("{cell:<width$} "));
    }
    out.push_str(line.trim_end());
    out.push('\n');
}

/// `id[path]` per missing version, where the path leads up to the version
/// that referenced it.
pub fn format_missing(missing: &Missing) -> String {
    missing
        .iter()
        .map(|(id, history)| {
            let path = history.as_slice();
            let via: Vec<String> = path[..path.len().saturating_sub(1)]
                .iter()
                .map(|nv| nv.to_string())
                .collect();
            format!("{id}[{}]", via.join("->"))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Serialize)]
struct Items<'a> {
    items: &'a [CheckEntry],
}

/// Format entries as `{"items": [...]}`.
pub fn format_json(entries: &[CheckEntry]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&Items { items: entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::{status, CheckResult};
    use ferry_core::{History, NameVersion};

    fn incomplete() -> CheckEntry {
        let x = NameVersion::new("test.de/x", "v1");
        let z = NameVersion::new("test.de/z", "v1");
        let mut result = CheckResult::default();
        result
            .missing
            .insert(z.clone(), [x.clone(), z].into_iter().collect::<History>());
        CheckEntry {
            status: status(&result, false),
            component_version: x,
            result,
            error: None,
        }
    }

    #[test]
    fn table_columns_align() {
        let table = format_table(&[incomplete()], false);
        assert_eq!(
            table,
            "COMPONENT VERSION STATUS     ERROR\n\
             test.de/x v1      Incomplete\n"
        );
    }

    #[test]
    fn wide_table_lists_missing_paths() {
        let table = format_table(&[incomplete()], true);
        assert!(table.lines().next().unwrap().ends_with("MISSING"));
        assert!(table.contains("test.de/z:v1[test.de/x:v1]"));
    }

    #[test]
    fn json_items() {
        let json: serde_json::Value =
            serde_json::from_str(&format_json(&[incomplete()]).unwrap()).unwrap();
        assert_eq!(json["items"][0]["status"], "Incomplete");
        assert_eq!(json["items"][0]["componentVersion"], "test.de/x:v1");
        assert_eq!(
            json["items"][0]["missing"]["test.de/z:v1"],
            serde_json::json!(["test.de/x:v1", "test.de/z:v1"])
        );
        assert!(json["items"][0].get("error").is_none());
    }
}
