use polars::prelude::*;
use rayon::prelude::*;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, instrument};
use tracing_error::SpanTrace;

use crate::actions::{MasterDataActions, ReadOnlyActions, RowActions};
use crate::domain::TTVError;
use crate::pipeline::{Column, Row, Value, cell_text, row};

#[derive(Debug, PartialEq)]
enum FileType {
    CSV,
    PARQUET,
    ARROW,
}

#[derive(Debug)]
struct FileInfo {
    path: PathBuf,
    file_size: u64,
    file_type: FileType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    Rooms,
    Subjects,
    Faculty,
    Batches,
}

impl DatasetKind {
    pub const ALL: [DatasetKind; 4] = [
        DatasetKind::Rooms,
        DatasetKind::Subjects,
        DatasetKind::Faculty,
        DatasetKind::Batches,
    ];

    pub fn title(self) -> &'static str {
        match self {
            DatasetKind::Rooms => "Rooms",
            DatasetKind::Subjects => "Subjects",
            DatasetKind::Faculty => "Faculty",
            DatasetKind::Batches => "Batches",
        }
    }

    fn entity(self) -> &'static str {
        match self {
            DatasetKind::Rooms => "room",
            DatasetKind::Subjects => "subject",
            DatasetKind::Faculty => "faculty",
            DatasetKind::Batches => "batch",
        }
    }

    fn description(self) -> &'static str {
        match self {
            DatasetKind::Rooms => "Manage classroom and facility information",
            DatasetKind::Subjects => "Manage course and subject information",
            DatasetKind::Faculty => "Manage faculty members and their information",
            DatasetKind::Batches => "Manage student batches and class groups",
        }
    }
}

/// One listing: its columns, its rows and what may be done with a row.
pub struct Dataset {
    pub name: String,
    pub description: String,
    pub columns: Vec<Column>,
    pub rows: Vec<Row>,
    pub actions: Box<dyn RowActions>,
}

fn sortable_columns(fields: &[(&str, &str)]) -> Vec<Column> {
    fields
        .iter()
        .map(|(key, label)| Column::new(*key, *label).sortable(true))
        .collect()
}

fn text(s: &str) -> Value {
    Value::from(s)
}

fn number(n: u32) -> Value {
    Value::from(n)
}

impl Dataset {
    pub fn sample(kind: DatasetKind) -> Self {
        let (columns, rows) = match kind {
            DatasetKind::Rooms => (
                sortable_columns(&[
                    ("id", "Room ID"),
                    ("name", "Room Name"),
                    ("type", "Type"),
                    ("capacity", "Capacity"),
                    ("building", "Building"),
                    ("status", "Status"),
                ]),
                [
                    ("R001", "Conference Room A", "Conference", 25, "Main Block", "Active"),
                    ("R002", "Computer Lab 1", "Lab", 40, "Tech Block", "Active"),
                    ("R003", "Lecture Hall 1", "Lecture", 150, "Academic Block", "Active"),
                    ("R004", "Seminar Room B", "Seminar", 30, "Main Block", "Maintenance"),
                    ("R005", "Physics Lab", "Lab", 35, "Science Block", "Active"),
                ]
                .into_iter()
                .map(|(id, name, kind, capacity, building, status)| {
                    row([
                        ("id", text(id)),
                        ("name", text(name)),
                        ("type", text(kind)),
                        ("capacity", number(capacity)),
                        ("building", text(building)),
                        ("status", text(status)),
                    ])
                })
                .collect(),
            ),
            DatasetKind::Subjects => (
                sortable_columns(&[
                    ("id", "Subject ID"),
                    ("name", "Subject Name"),
                    ("department", "Department"),
                    ("credits", "Credits"),
                    ("type", "Type"),
                    ("status", "Status"),
                ]),
                [
                    ("CS101", "Introduction to Programming", "Computer Science", 4, "Core", "Active"),
                    ("MATH201", "Calculus II", "Mathematics", 3, "Core", "Active"),
                    ("ENG101", "English Composition", "English", 3, "General", "Active"),
                    ("PHY201", "Quantum Physics", "Physics", 4, "Core", "Active"),
                    ("BIO101", "Cell Biology", "Biology", 3, "Core", "Inactive"),
                ]
                .into_iter()
                .map(|(id, name, department, credits, kind, status)| {
                    row([
                        ("id", text(id)),
                        ("name", text(name)),
                        ("department", text(department)),
                        ("credits", number(credits)),
                        ("type", text(kind)),
                        ("status", text(status)),
                    ])
                })
                .collect(),
            ),
            DatasetKind::Faculty => (
                sortable_columns(&[
                    ("id", "Faculty ID"),
                    ("name", "Name"),
                    ("department", "Department"),
                    ("email", "Email"),
                    ("specialization", "Specialization"),
                    ("status", "Status"),
                ]),
                [
                    ("F001", "Dr. Sarah Johnson", "Computer Science", "s.johnson@edu.com", "AI/ML", "Active"),
                    ("F002", "Prof. Michael Chen", "Mathematics", "m.chen@edu.com", "Applied Math", "Active"),
                    ("F003", "Dr. Emily Davis", "Physics", "e.davis@edu.com", "Quantum Mechanics", "Active"),
                    ("F004", "Prof. Robert Wilson", "English", "r.wilson@edu.com", "Literature", "On Leave"),
                ]
                .into_iter()
                .map(|(id, name, department, email, specialization, status)| {
                    row([
                        ("id", id),
                        ("name", name),
                        ("department", department),
                        ("email", email),
                        ("specialization", specialization),
                        ("status", status),
                    ])
                })
                .collect(),
            ),
            DatasetKind::Batches => (
                sortable_columns(&[
                    ("id", "Batch ID"),
                    ("name", "Batch Name"),
                    ("year", "Year"),
                    ("semester", "Semester"),
                    ("students", "Students"),
                    ("department", "Department"),
                    ("status", "Status"),
                ]),
                [
                    ("CS2024A", "Computer Science Batch A", 45, "Computer Science"),
                    ("MATH2024A", "Mathematics Batch A", 38, "Mathematics"),
                    ("PHY2024A", "Physics Batch A", 42, "Physics"),
                    ("ENG2024A", "English Batch A", 35, "English"),
                ]
                .into_iter()
                .map(|(id, name, students, department)| {
                    row([
                        ("id", text(id)),
                        ("name", text(name)),
                        ("year", text("2024")),
                        ("semester", text("Fall")),
                        ("students", number(students)),
                        ("department", text(department)),
                        ("status", text("Active")),
                    ])
                })
                .collect(),
            ),
        };

        Dataset {
            name: kind.title().to_string(),
            description: kind.description().to_string(),
            columns,
            rows,
            actions: Box::new(MasterDataActions::new(kind.entity())),
        }
    }

    /// Read a csv, parquet or arrow file. Every column becomes a sortable
    /// column keyed by its header.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: PathBuf) -> Result<Self, TTVError> {
        let file_info = Self::get_file_info(path)?;
        debug!("Loading {:?}", file_info);
        let frame = match file_info.file_type {
            FileType::CSV => Self::load_csv(&file_info.path)?,
            FileType::PARQUET => Self::load_parquet(&file_info.path)?,
            FileType::ARROW => Self::load_arrow(&file_info.path)?,
        };

        // Each column is converted in its own rayon task.
        let start_time = Instant::now();
        let df = frame.collect()?;
        let c_: Result<Vec<(String, Vec<Option<Value>>)>, PolarsError> = df
            .get_column_names()
            .par_iter()
            .map(|name| Self::load_column(&df, name))
            .collect();
        let loaded = c_.map_err(|e| {
            TTVError::LoadingFailed(format!("{e}\n{}", SpanTrace::capture()))
        })?;

        let rows = (0..df.height())
            .map(|ridx| {
                loaded
                    .iter()
                    .filter_map(|(name, values)| {
                        values[ridx].as_ref().map(|v| (name.clone(), v.clone()))
                    })
                    .collect::<Row>()
            })
            .collect::<Vec<Row>>();

        let columns = loaded
            .iter()
            .map(|(name, _)| Column::new(name.as_str(), name.as_str()).sortable(true))
            .collect::<Vec<Column>>();

        info!(
            "Loaded {} rows and {} columns ({} bytes) in {}ms",
            rows.len(),
            columns.len(),
            file_info.file_size,
            start_time.elapsed().as_millis()
        );

        let name = file_info
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("???")
            .to_string();

        Ok(Dataset {
            description: file_info.path.display().to_string(),
            name,
            columns,
            rows,
            actions: Box::new(ReadOnlyActions),
        })
    }

    fn load_column(
        df: &DataFrame,
        col_name: &str,
    ) -> Result<(String, Vec<Option<Value>>), PolarsError> {
        let column = df.column(col_name)?;
        let mut values: Vec<Option<Value>> = Vec::with_capacity(column.len());
        let dtype = column.dtype();
        if *dtype == DataType::UInt64 {
            for value in column.u64()?.into_iter() {
                values.push(value.map(Value::from));
            }
        } else if Self::is_integer_type(dtype) {
            // Every other integer type fits into i64 without loss
            let col = column.cast(&DataType::Int64)?;
            for value in col.i64()?.into_iter() {
                values.push(value.map(Value::from));
            }
        } else if Self::is_float_type(dtype) {
            let col = column.cast(&DataType::Float64)?;
            for value in col.f64()?.into_iter() {
                values.push(value.map(Value::Number));
            }
        } else {
            let col = column.cast(&DataType::String)?;
            for value in col.str()?.into_iter() {
                values.push(value.map(|s| Value::Text(s.to_string())));
            }
        }
        Ok((col_name.to_string(), values))
    }

    fn is_integer_type(dtype: &DataType) -> bool {
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
        )
    }

    fn is_float_type(dtype: &DataType) -> bool {
        matches!(dtype, DataType::Float32 | DataType::Float64)
    }

    fn detect_file_type(path: &Path) -> Result<FileType, TTVError> {
        match path
            .extension()
            .and_then(|s| s.to_str())
            .map(|s| s.to_uppercase())
            .as_deref()
        {
            Some("CSV") => Ok(FileType::CSV),
            Some("PARQUET") | Some("PQ") => Ok(FileType::PARQUET),
            Some("ARROW") | Some("IPC") | Some("FEATHER") => Ok(FileType::ARROW),
            _ => Err(TTVError::UnknownFileType),
        }
    }

    fn get_file_info(path: PathBuf) -> Result<FileInfo, TTVError> {
        let metadata = fs::metadata(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => TTVError::FileNotFound,
            ErrorKind::PermissionDenied => TTVError::PermissionDenied,
            _ => TTVError::IoError(e),
        })?;
        if !metadata.is_file() {
            return Err(TTVError::LoadingFailed("Not a file!".into()));
        }

        let file_size = metadata.len();
        let file_type = Self::detect_file_type(&path)?;

        Ok(FileInfo {
            path,
            file_size,
            file_type,
        })
    }

    fn load_csv(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyCsvReader::new(PlPath::Local(path.as_path().into()))
            .with_has_header(true)
            .finish()
    }

    fn load_parquet(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_parquet(
            PlPath::Local(path.as_path().into()),
            ScanArgsParquet::default(),
        )
    }

    fn load_arrow(path: &PathBuf) -> Result<LazyFrame, PolarsError> {
        LazyFrame::scan_ipc(
            PlPath::Local(path.as_path().into()),
            polars::io::ipc::IpcScanOptions,
            UnifiedScanArgs::default(),
        )
    }
}

// Quote cells the way spreadsheets expect them on paste.
fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.chars().any(|c| c == '"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

pub fn row_to_csv(row: &Row, columns: &[Column]) -> String {
    columns
        .iter()
        .map(|c| wrap_cell_content(&cell_text(row, &c.key)))
        .collect::<Vec<String>>()
        .join(",")
}

/// Header line of column labels followed by one line per row.
pub fn view_to_csv(rows: &[&Row], columns: &[Column]) -> String {
    let header = columns
        .iter()
        .map(|c| wrap_cell_content(&c.label))
        .collect::<Vec<String>>()
        .join(",");
    std::iter::once(header)
        .chain(rows.iter().map(|r| row_to_csv(r, columns)))
        .collect::<Vec<String>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::RowAction;
    use crate::pipeline::{SortDirection, ViewState, view};
    use std::io::Write;

    #[test]
    fn sample_sets_have_their_columns() {
        for kind in DatasetKind::ALL {
            let dataset = Dataset::sample(kind);
            assert_eq!(dataset.name, kind.title());
            assert!(!dataset.rows.is_empty());
            assert!(dataset.columns.iter().all(|c| c.sortable));
            for r in &dataset.rows {
                for c in &dataset.columns {
                    assert!(r.contains_key(&c.key), "{} misses {}", dataset.name, c.key);
                }
            }
            assert!(dataset.actions.supports(RowAction::Delete));
        }
        assert_eq!(Dataset::sample(DatasetKind::Batches).columns.len(), 7);
    }

    #[test]
    fn rooms_sorted_by_capacity() {
        let rooms = Dataset::sample(DatasetKind::Rooms);
        let state = ViewState::default().sorted_by("capacity", SortDirection::Descending);
        let ids: Vec<String> = view(&rooms.rows, &rooms.columns, &state)
            .iter()
            .map(|r| cell_text(r, "id"))
            .collect();
        assert_eq!(ids, vec!["R003", "R002", "R005", "R004", "R001"]);
    }

    #[test]
    fn search_faculty_by_status() {
        let faculty = Dataset::sample(DatasetKind::Faculty);
        let state = ViewState::default().with_search("leave");
        let found = view(&faculty.rows, &faculty.columns, &state);
        assert_eq!(found.len(), 1);
        assert_eq!(cell_text(found[0], "id"), "F004");
    }

    #[test]
    fn csv_quoting() {
        let columns = vec![Column::new("a", "A"), Column::new("b", "Col B")];
        let r = row([("a", "say \"hi\""), ("b", "plain")]);
        assert_eq!(row_to_csv(&r, &columns), "\"say \"\"hi\"\"\",plain");

        let r2 = row([("a", "x,y")]);
        assert_eq!(
            view_to_csv(&[&r, &r2], &columns),
            "A,\"Col B\"\n\"say \"\"hi\"\"\",plain\n\"x,y\","
        );
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let mut file = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        writeln!(file, "a,b").unwrap();
        assert!(matches!(
            Dataset::load(file.path().to_path_buf()),
            Err(TTVError::UnknownFileType)
        ));
    }

    #[test]
    fn missing_file_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            Dataset::load(dir.path().join("nope.csv")),
            Err(TTVError::FileNotFound)
        ));
        assert!(matches!(
            Dataset::load(dir.path().to_path_buf()),
            Err(TTVError::LoadingFailed(_))
        ));
    }

    #[test]
    fn load_csv_keeps_large_ids_exact() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,score").unwrap();
        writeln!(file, "9007199254740993,1.5").unwrap();
        writeln!(file, "9007199254740992,0.25").unwrap();
        writeln!(file, "7,NaN").unwrap();
        file.flush().unwrap();

        let dataset = Dataset::load(file.path().to_path_buf()).unwrap();
        assert_eq!(
            dataset.rows[0].get("id"),
            Some(&Value::Integer(9_007_199_254_740_993))
        );
        assert_eq!(cell_text(&dataset.rows[0], "id"), "9007199254740993");
        assert_eq!(
            row_to_csv(&dataset.rows[0], &dataset.columns),
            "9007199254740993,1.5"
        );

        let state = ViewState::default().with_search("9007199254740993");
        let found = view(&dataset.rows, &dataset.columns, &state);
        assert_eq!(found.len(), 1);

        let state = ViewState::default().sorted_by("id", SortDirection::Descending);
        let ids: Vec<String> = view(&dataset.rows, &dataset.columns, &state)
            .iter()
            .map(|r| cell_text(r, "id"))
            .collect();
        assert_eq!(ids, vec!["9007199254740993", "9007199254740992", "7"]);

        // NaN ranks with missing values, below every number
        let state = ViewState::default().sorted_by("score", SortDirection::Ascending);
        let ids: Vec<String> = view(&dataset.rows, &dataset.columns, &state)
            .iter()
            .map(|r| cell_text(r, "id"))
            .collect();
        assert_eq!(ids, vec!["7", "9007199254740992", "9007199254740993"]);
    }

    #[test]
    fn load_csv_keeps_numbers_numeric() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,capacity,status").unwrap();
        writeln!(file, "R1,120,Active").unwrap();
        writeln!(file, "R2,8,").unwrap();
        writeln!(file, "R3,30,Maintenance").unwrap();
        file.flush().unwrap();

        let dataset = Dataset::load(file.path().to_path_buf()).unwrap();
        assert_eq!(dataset.rows.len(), 3);
        let keys: Vec<&str> = dataset.columns.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(keys, vec!["id", "capacity", "status"]);
        assert_eq!(dataset.rows[0].get("capacity"), Some(&Value::Integer(120)));
        assert_eq!(dataset.rows[1].get("status"), None);
        assert!(!dataset.actions.supports(RowAction::Edit));

        let state = ViewState::default().sorted_by("capacity", SortDirection::Ascending);
        let ids: Vec<String> = view(&dataset.rows, &dataset.columns, &state)
            .iter()
            .map(|r| cell_text(r, "id"))
            .collect();
        assert_eq!(ids, vec!["R2", "R3", "R1"]);
    }
}
