//! Demo binary: browse a csv/parquet/arrow file as a filterable,
//! sortable, pageable list. Columns and quick filters are derived from
//! the file; the engine itself never touches the data source.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use arboard::Clipboard;
use clap::Parser;
use polars::prelude::*;
use rayon::prelude::*;
use tracing::{error, info, trace};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use listgrid::{
    Align, BulkAction, CellValue, ColumnSpec, Controller, FieldGroup, FieldSpec, FilterKind,
    FilterOption, JsonFileStore, ListConfig, ListError, ListHooks, ListModel, ListUI,
    QuickFilterSpec, Status,
};

/// Columns with this many distinct values or fewer get an automatic
/// quick filter.
const FILTER_OPTION_CAP: usize = 12;

#[derive(Debug, Parser)]
#[command(name = "listgrid", about = "Browse a data file as a filterable list")]
struct Cli {
    /// Data file: csv, parquet or arrow/ipc. `~` and `$VAR` expand.
    path: String,
    /// Rows per page.
    #[arg(long, default_value_t = 50)]
    page_size: usize,
    /// Column visibility preference file.
    #[arg(long, default_value = "~/.config/listgrid/columns.json")]
    prefs: String,
    /// Append logs to this file; the tui owns the terminal, so without it
    /// logging stays off.
    #[arg(long)]
    log: Option<String>,
}

#[derive(Debug, Clone)]
struct Row {
    id: usize,
    cells: Vec<Option<String>>,
}

#[derive(Debug, Clone)]
struct ColumnMeta {
    name: String,
    numeric: bool,
}

struct Dataset {
    meta: Vec<ColumnMeta>,
    rows: Vec<Row>,
}

#[derive(Debug)]
enum FileKind {
    Csv,
    Parquet,
    Arrow,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Err(e) = init_tracing(cli.log.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }
    match run(cli) {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_tracing(log: Option<&str>) -> Result<(), ListError> {
    let Some(log) = log else {
        return Ok(());
    };
    let path = expand(log)?;
    let file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run(cli: Cli) -> Result<(), ListError> {
    let data_path = expand(&cli.path)?;
    let dataset = load_dataset(&data_path)?;

    let prefs_path = expand(&cli.prefs)?;
    if let Some(dir) = prefs_path.parent() {
        fs::create_dir_all(dir)?;
    }
    let view_name = data_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("listgrid")
        .to_string();

    let config = ListConfig::default().with_page_size(cli.page_size);
    let columns = column_specs(&dataset.meta);
    let filters = quick_filters(&dataset.meta, &dataset.rows);
    let groups = field_groups(&dataset.meta);
    info!(
        "View '{view_name}': {} columns, {} quick filters",
        columns.len(),
        filters.len()
    );

    let clipboard = Rc::new(RefCell::new(Clipboard::new().ok()));
    let header: String = dataset
        .meta
        .iter()
        .map(|m| wrap_cell(&m.name))
        .collect::<Vec<_>>()
        .join(",");
    let deleted: Rc<RefCell<HashSet<usize>>> = Rc::new(RefCell::new(HashSet::new()));

    let hooks = ListHooks::new()
        .row_click(|row: &Row| trace!("Opened record {}", row.id))
        .import(|path: &Path| info!("Import requested from {}", path.display()))
        .export({
            let clipboard = Rc::clone(&clipboard);
            let header = header.clone();
            move |records: &[&Row]| copy_rows(&clipboard, &header, records)
        });
    let bulk_actions = vec![
        BulkAction::new("Copy rows", {
            let clipboard = Rc::clone(&clipboard);
            move |records: &[&Row]| copy_rows(&clipboard, &header, records)
        }),
        BulkAction::new("Delete rows", {
            let deleted = Rc::clone(&deleted);
            move |records: &[&Row]| {
                deleted.borrow_mut().extend(records.iter().map(|r| r.id));
            }
        })
        .destructive(),
    ];

    let mut model = ListModel::new(
        config.clone(),
        columns,
        filters,
        Box::new(JsonFileStore::new(prefs_path)),
        view_name,
    )
    .hooks(hooks)
    .bulk_actions(bulk_actions)
    .field_groups(groups);
    model.set_records(dataset.rows.clone());

    let mut ui = ListUI::new();
    let controller = Controller::new(&config);
    let mut terminal = ratatui::init();
    let mut applied_deletes = 0usize;

    while model.status != Status::Quitting {
        terminal.draw(|f| ui.draw(&model, f))?;

        if let Some(message) = controller.handle_event(&model)? {
            model.update(message);
        }

        // The engine never removes records itself; apply what the delete
        // action collected and hand back a fresh record set.
        let pending = deleted.borrow().len();
        if pending != applied_deletes {
            applied_deletes = pending;
            let dropped = deleted.borrow().clone();
            let rows: Vec<Row> = dataset
                .rows
                .iter()
                .filter(|r| !dropped.contains(&r.id))
                .cloned()
                .collect();
            info!("Dropped {} rows, {} remain", dropped.len(), rows.len());
            model.clear_selection();
            model.set_records(rows);
        }
    }
    Ok(())
}

fn expand(path: &str) -> Result<PathBuf, ListError> {
    let expanded = shellexpand::full(path).map_err(|e| ListError::LoadingFailed(e.to_string()))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

// ------------------------------ loading -------------------------------

fn detect_file_kind(path: &Path) -> Result<FileKind, ListError> {
    match path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_uppercase())
        .as_deref()
    {
        Some("CSV") => Ok(FileKind::Csv),
        Some("PARQUET") | Some("PQ") => Ok(FileKind::Parquet),
        Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileKind::Arrow),
        _ => Err(ListError::UnknownFileType),
    }
}

fn scan(path: &Path, kind: FileKind) -> Result<LazyFrame, PolarsError> {
    match kind {
        FileKind::Csv => LazyCsvReader::new(PlPath::Local(path.into()))
            .with_has_header(true)
            .finish(),
        FileKind::Parquet => {
            LazyFrame::scan_parquet(PlPath::Local(path.into()), ScanArgsParquet::default())
        }
        FileKind::Arrow => LazyFrame::scan_ipc(
            PlPath::Local(path.into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        ),
    }
}

/// Materialize the file into per-row string records. Each column is
/// converted in its own rayon task; numeric dtypes are remembered so the
/// accessors can hand out numbers for sorting.
fn load_dataset(path: &PathBuf) -> Result<Dataset, ListError> {
    let metadata = fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => ListError::FileNotFound,
        ErrorKind::PermissionDenied => ListError::PermissionDenied,
        _ => ListError::Io(e),
    })?;
    if !metadata.is_file() {
        return Err(ListError::FileNotFound);
    }
    let kind = detect_file_kind(path)?;

    let started = Instant::now();
    let df = Arc::new(scan(path, kind)?.collect()?);
    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    let columns: Vec<(ColumnMeta, Vec<Option<String>>)> = names
        .par_iter()
        .map(|name| load_column(&df, name))
        .collect::<Result<_, PolarsError>>()?;
    info!(
        "Loaded {} ({} rows x {} columns) in {}ms",
        path.display(),
        df.height(),
        columns.len(),
        started.elapsed().as_millis()
    );

    let meta: Vec<ColumnMeta> = columns.iter().map(|(m, _)| m.clone()).collect();
    let rows = (0..df.height())
        .map(|i| Row {
            id: i,
            cells: columns.iter().map(|(_, values)| values[i].clone()).collect(),
        })
        .collect();
    Ok(Dataset { meta, rows })
}

fn load_column(
    df: &DataFrame,
    name: &str,
) -> Result<(ColumnMeta, Vec<Option<String>>), PolarsError> {
    let dtype = df.column(name)?.dtype().clone();
    let col = df.column(name)?.cast(&DataType::String)?;
    let series = col.str()?;
    let mut values = Vec::with_capacity(series.len());
    for v in series.iter() {
        values.push(v.map(str::to_string));
    }
    let meta = ColumnMeta {
        name: name.to_string(),
        numeric: is_numeric(&dtype),
    };
    Ok((meta, values))
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

// ---------------------------- view wiring -----------------------------

fn cell_accessor(idx: usize, numeric: bool) -> impl Fn(&Row) -> Option<CellValue> + 'static {
    move |row: &Row| {
        let cell = row.cells.get(idx)?.as_ref()?;
        if numeric && let Ok(n) = cell.parse::<f64>() {
            return Some(CellValue::Number(n));
        }
        Some(CellValue::text(cell.clone()))
    }
}

fn column_specs(meta: &[ColumnMeta]) -> Vec<ColumnSpec<Row>> {
    meta.iter()
        .enumerate()
        .map(|(idx, m)| {
            let spec = ColumnSpec::new(m.name.clone(), m.name.clone(), cell_accessor(idx, m.numeric));
            if m.numeric { spec.align(Align::Right) } else { spec }
        })
        .collect()
}

/// Auto-derive a multi-select quick filter for every low-cardinality
/// text column.
fn quick_filters(meta: &[ColumnMeta], rows: &[Row]) -> Vec<QuickFilterSpec<Row>> {
    meta.iter()
        .enumerate()
        .filter(|(_, m)| !m.numeric)
        .filter_map(|(idx, m)| {
            let mut distinct = BTreeSet::new();
            for row in rows {
                if let Some(Some(v)) = row.cells.get(idx) {
                    distinct.insert(v.clone());
                }
                if distinct.len() > FILTER_OPTION_CAP {
                    return None;
                }
            }
            if distinct.is_empty() {
                return None;
            }
            let options = distinct
                .into_iter()
                .map(|v| FilterOption::new(v.clone(), v))
                .collect();
            Some(
                QuickFilterSpec::new(
                    m.name.clone(),
                    m.name.clone(),
                    FilterKind::Select,
                    cell_accessor(idx, false),
                )
                .options(options)
                .multi(),
            )
        })
        .collect()
}

fn field_groups(meta: &[ColumnMeta]) -> Vec<FieldGroup<Row>> {
    let fields = meta
        .iter()
        .enumerate()
        .map(|(idx, m)| FieldSpec::new(m.name.clone(), m.name.clone(), cell_accessor(idx, m.numeric)))
        .collect();
    vec![FieldGroup::new("Record", fields)]
}

// ------------------------------ clipboard -----------------------------

fn copy_rows(clipboard: &Rc<RefCell<Option<Clipboard>>>, header: &str, records: &[&Row]) {
    let mut text = header.to_string();
    for row in records {
        text.push('\n');
        text.push_str(&csv_line(row));
    }
    match clipboard.borrow_mut().as_mut() {
        Some(cb) => match cb.set_text(text) {
            Ok(_) => trace!("Copied {} rows to clipboard", records.len()),
            Err(e) => error!("Error copying to clipboard: {e:?}"),
        },
        None => error!("Clipboard is not available"),
    }
}

fn csv_line(row: &Row) -> String {
    row.cells
        .iter()
        .map(|c| wrap_cell(c.as_deref().unwrap_or("")))
        .collect::<Vec<String>>()
        .join(",")
}

fn wrap_cell(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = needs_escaping || c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    if needs_escaping {
        format!("\"{}\"", c.replace('"', "\"\""))
    } else if needs_wrapping {
        format!("\"{c}\"")
    } else {
        c.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_kind_detection_by_extension() {
        assert!(matches!(
            detect_file_kind(Path::new("data.csv")),
            Ok(FileKind::Csv)
        ));
        assert!(matches!(
            detect_file_kind(Path::new("data.PQ")),
            Ok(FileKind::Parquet)
        ));
        assert!(matches!(
            detect_file_kind(Path::new("data.feather")),
            Ok(FileKind::Arrow)
        ));
        assert!(matches!(
            detect_file_kind(Path::new("data.xlsx")),
            Err(ListError::UnknownFileType)
        ));
    }

    #[test]
    fn wrap_cell_escapes_like_csv() {
        assert_eq!(wrap_cell("plain"), "plain");
        assert_eq!(wrap_cell("a,b"), "\"a,b\"");
        assert_eq!(wrap_cell("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn numeric_accessor_parses_numbers() {
        let row = Row {
            id: 0,
            cells: vec![Some("12.5".into()), Some("n/a".into()), None],
        };
        assert_eq!(cell_accessor(0, true)(&row), Some(CellValue::Number(12.5)));
        assert_eq!(cell_accessor(1, true)(&row), Some(CellValue::text("n/a")));
        assert_eq!(cell_accessor(2, true)(&row), None);
    }

    #[test]
    fn low_cardinality_text_columns_get_filters() {
        let meta = vec![
            ColumnMeta { name: "status".into(), numeric: false },
            ColumnMeta { name: "amount".into(), numeric: true },
        ];
        let rows: Vec<Row> = (0..40)
            .map(|i| Row {
                id: i,
                cells: vec![
                    Some(if i % 2 == 0 { "open" } else { "closed" }.into()),
                    Some(i.to_string()),
                ],
            })
            .collect();
        let filters = quick_filters(&meta, &rows);
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].key, "status");
        assert_eq!(filters[0].options.len(), 2);
    }
}
