//! Import of historical tasks from CSV exports
//!
//! The parser is deliberately lenient about headers: a column is found when
//! one of its candidate names appears anywhere inside a header cell, so
//! `"Task Title"` and `"story_points (final)"` both resolve.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::estimation::{is_on_scale, snap_to_scale};
use crate::history::Task;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CsvImportError {
    #[error("CSV must contain a header line and at least one data line")]
    TooFewLines,

    #[error("Required columns not found: {}. Expected columns: title, description, type, storyPoints", .0.join(", "))]
    MissingColumns(Vec<String>),
}

/// One parsed data line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub title: String,
    pub description: String,
    pub task_type: String,
    pub story_points: u32,
}

const TITLE_COLUMNS: &[&str] = &["title", "titulo", "nome", "name", "task"];
const DESCRIPTION_COLUMNS: &[&str] = &["description", "descricao", "desc", "details", "detalhes"];
const TYPE_COLUMNS: &[&str] = &["type", "tipo", "category", "categoria"];
const POINTS_COLUMNS: &[&str] = &["storypoints", "story_points", "points", "pontos", "sp"];

#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    title: usize,
    description: usize,
    task_type: usize,
    story_points: usize,
}

impl ColumnMap {
    fn resolve(headers: &[String]) -> Result<Self, CsvImportError> {
        let title = find_column_index(headers, TITLE_COLUMNS);
        let description = find_column_index(headers, DESCRIPTION_COLUMNS);
        let task_type = find_column_index(headers, TYPE_COLUMNS);
        let story_points = find_column_index(headers, POINTS_COLUMNS);

        match (title, description, task_type, story_points) {
            (Some(title), Some(description), Some(task_type), Some(story_points)) => Ok(Self {
                title,
                description,
                task_type,
                story_points,
            }),
            _ => {
                let missing = [
                    ("title", title),
                    ("description", description),
                    ("type", task_type),
                    ("storyPoints", story_points),
                ]
                .into_iter()
                .filter(|(_, index)| index.is_none())
                .map(|(name, _)| name.to_string())
                .collect();
                Err(CsvImportError::MissingColumns(missing))
            }
        }
    }

    fn required_len(&self) -> usize {
        self.title
            .max(self.description)
            .max(self.task_type)
            .max(self.story_points)
            + 1
    }
}

/// Parse CSV content into rows. Malformed data lines are skipped with a
/// warning; only a missing header or missing columns fail the whole import.
pub fn parse_csv(content: &str) -> Result<Vec<CsvRow>, CsvImportError> {
    let lines: Vec<&str> = content.trim().split('\n').collect();
    if lines.len() < 2 {
        return Err(CsvImportError::TooFewLines);
    }

    let headers: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().to_lowercase().replace('"', ""))
        .collect();
    let columns = ColumnMap::resolve(&headers)?;
    debug!("Resolved CSV columns: {:?}", columns);

    let mut rows = Vec::new();
    for (i, raw) in lines.iter().enumerate().skip(1) {
        let line_number = i + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        let values = parse_csv_line(line);
        if values.len() < columns.required_len() {
            warn!(
                "Line {} has fewer columns than expected, skipping",
                line_number
            );
            continue;
        }

        let points_value = clean_value(&values[columns.story_points]);
        let Some(story_points) = parse_story_points(&points_value) else {
            warn!(
                "Line {}: invalid story points value {:?}, skipping",
                line_number, points_value
            );
            continue;
        };

        let row = CsvRow {
            title: clean_value(&values[columns.title]),
            description: clean_value(&values[columns.description]),
            task_type: normalize_task_type(&clean_value(&values[columns.task_type])).to_string(),
            story_points,
        };

        if row.title.is_empty() || row.description.is_empty() {
            warn!("Line {}: empty title or description, skipping", line_number);
            continue;
        }

        rows.push(row);
    }

    Ok(rows)
}

/// Non-blank lines after the header; with the row count from [`parse_csv`]
/// this gives the number of skipped lines.
pub fn data_line_count(content: &str) -> usize {
    content
        .trim()
        .split('\n')
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .count()
}

/// Index of the first header containing any candidate, candidates tried in
/// order.
pub fn find_column_index(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|name| headers.iter().position(|h| h.contains(name)))
}

/// Split one line on commas outside double quotes. Quote characters toggle
/// the quoted state and are not kept.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut result = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for c in line.chars() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => result.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }

    result.push(current);
    result
}

/// Strip one leading and one trailing quote, then surrounding whitespace.
pub fn clean_value(value: &str) -> String {
    let value = value.strip_prefix('"').unwrap_or(value);
    let value = value.strip_suffix('"').unwrap_or(value);
    value.trim().to_string()
}

/// Map free-form type labels onto the four known types; anything
/// unrecognised becomes `feature`.
pub fn normalize_task_type(label: &str) -> &'static str {
    let lowered = label.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lowered.contains(n));

    if has(&["feature", "funcionalidade", "nova"]) {
        "feature"
    } else if has(&["bug", "erro", "correção"]) {
        "bug"
    } else if has(&["refactor", "refatoração"]) {
        "refactor"
    } else if has(&["doc", "documentação"]) {
        "documentation"
    } else {
        "feature"
    }
}

/// Leading integer of `value` snapped to the scale, or `None` when the value
/// does not start with a number.
pub fn parse_story_points(value: &str) -> Option<u32> {
    let number = parse_leading_int(value)?;
    if is_on_scale(number) {
        return u32::try_from(number).ok();
    }
    Some(snap_to_scale(number))
}

/// Optional sign followed by decimal digits, ignoring whatever follows.
fn parse_leading_int(value: &str) -> Option<i64> {
    let value = value.trim_start();
    let (negative, digits) = match value.as_bytes().first() {
        Some(b'-') => (true, &value[1..]),
        Some(b'+') => (false, &value[1..]),
        _ => (false, value),
    };

    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }

    // Saturate absurdly long numbers; they snap to the top of the scale anyway.
    let magnitude = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Turn parsed rows into history tasks. The CSV points serve as both the
/// estimated and the final points.
///
/// Ids carry a per-import suffix so two imports in the same millisecond do
/// not overwrite each other.
pub fn csv_rows_to_tasks(rows: Vec<CsvRow>) -> Vec<Task> {
    let millis = Utc::now().timestamp_millis();
    let batch = Uuid::new_v4().simple().to_string();
    let batch = &batch[..8];
    rows.into_iter()
        .enumerate()
        .map(|(index, row)| {
            let mut task = Task::new(
                row.title,
                row.description,
                row.task_type,
                row.story_points,
                row.story_points,
            );
            task.id = format!("csv-import-{}-{}-{}", millis, batch, index);
            task
        })
        .collect()
}

/// Example file offered for download.
pub fn generate_sample_csv() -> String {
    const HEADERS: [&str; 4] = ["title", "description", "type", "storyPoints"];
    const SAMPLE_ROWS: [[&str; 4]; 4] = [
        [
            "Implementar login de usuário",
            "Criar tela de login com validação de email e senha, integração com backend de autenticação",
            "feature",
            "5",
        ],
        [
            "Corrigir bug no carrinho de compras",
            "Produtos duplicados aparecem no carrinho quando adicionados rapidamente",
            "bug",
            "3",
        ],
        [
            "Refatorar componente de navegação",
            "Melhorar performance e organização do código do menu principal",
            "refactor",
            "8",
        ],
        [
            "Documentar API de pagamentos",
            "Criar documentação completa dos endpoints de pagamento com exemplos",
            "documentation",
            "2",
        ],
    ];

    let mut lines = vec![HEADERS.join(",")];
    lines.extend(SAMPLE_ROWS.iter().map(|row| {
        row.iter()
            .map(|cell| format!("\"{}\"", cell))
            .collect::<Vec<_>>()
            .join(",")
    }));
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_few_lines() {
        assert_eq!(parse_csv("title,description,type,points"), Err(CsvImportError::TooFewLines));
        assert_eq!(parse_csv("   "), Err(CsvImportError::TooFewLines));
    }

    #[test]
    fn test_missing_columns() {
        let err = parse_csv("title,description\na,b").unwrap_err();
        assert_eq!(
            err,
            CsvImportError::MissingColumns(vec!["type".into(), "storyPoints".into()])
        );
        assert!(err.to_string().contains("type, storyPoints"));
    }

    #[test]
    fn test_column_substring_match() {
        let headers: Vec<String> = vec!["task name".into(), "detalhes".into(), "categoria".into(), "sp".into()];
        assert_eq!(find_column_index(&headers, TITLE_COLUMNS), Some(0));
        assert_eq!(find_column_index(&headers, DESCRIPTION_COLUMNS), Some(1));
        assert_eq!(find_column_index(&headers, TYPE_COLUMNS), Some(2));
        assert_eq!(find_column_index(&headers, POINTS_COLUMNS), Some(3));
    }

    #[test]
    fn test_quoted_values() {
        assert_eq!(
            parse_csv_line(r#""Login","Tela de login, com validação",feature,5"#),
            vec!["Login", "Tela de login, com validação", "feature", "5"]
        );
    }

    #[test]
    fn test_parse_story_points() {
        assert_eq!(parse_story_points("5"), Some(5));
        assert_eq!(parse_story_points("6"), Some(5));
        assert_eq!(parse_story_points("4"), Some(3));
        assert_eq!(parse_story_points("8.5"), Some(8));
        assert_eq!(parse_story_points("100"), Some(21));
        assert_eq!(parse_story_points("-2"), Some(1));
        assert_eq!(parse_story_points("0"), Some(1));
        assert_eq!(parse_story_points("abc"), None);
        assert_eq!(parse_story_points(""), None);
    }

    #[test]
    fn test_normalize_task_type() {
        assert_eq!(normalize_task_type("Nova Funcionalidade"), "feature");
        assert_eq!(normalize_task_type("Correção"), "bug");
        assert_eq!(normalize_task_type("ERRO"), "bug");
        assert_eq!(normalize_task_type("Refatoração"), "refactor");
        assert_eq!(normalize_task_type("Docs"), "documentation");
        assert_eq!(normalize_task_type("spike"), "feature");
    }

    #[test]
    fn test_skips_bad_rows() {
        let content = "title,description,type,storyPoints\n\
                       Login,Criar tela,feature,6\n\
                       \n\
                       Short,row\n\
                       Bad points,desc,bug,many\n\
                       ,sem título,bug,2\n\
                       Doc,Escrever guia,documentação,1\r\n";
        let rows = parse_csv(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].story_points, 5);
        assert_eq!(rows[0].task_type, "feature");
        assert_eq!(rows[1].task_type, "documentation");
        assert_eq!(rows[1].story_points, 1);
        assert_eq!(data_line_count(content), 5);
    }

    #[test]
    fn test_sample_csv_round_trips() {
        let rows = parse_csv(&generate_sample_csv()).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].title, "Implementar login de usuário");
        assert_eq!(rows[2].story_points, 8);
    }

    #[test]
    fn test_rows_to_tasks() {
        let rows = parse_csv(&generate_sample_csv()).unwrap();
        let tasks = csv_rows_to_tasks(rows);
        assert_eq!(tasks.len(), 4);
        assert!(tasks[3].id.starts_with("csv-import-"));
        assert!(tasks[3].id.ends_with("-3"));
        assert_eq!(tasks[1].estimated_points, 3);
        assert_eq!(tasks[1].final_points, 3);
        assert_eq!(tasks[1].task_type, "bug");
    }

    #[test]
    fn test_back_to_back_imports_get_distinct_ids() {
        let csv = generate_sample_csv();
        let first = csv_rows_to_tasks(parse_csv(&csv).unwrap());
        let second = csv_rows_to_tasks(parse_csv(&csv).unwrap());
        for (a, b) in first.iter().zip(&second) {
            assert_ne!(a.id, b.id);
        }
    }
}
