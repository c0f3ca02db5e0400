//! Student persistence port and SQLite implementation.
//!
//! # Responsibility
//! - Define the only read/write surface the student service depends on.
//! - Keep SQL details and row decoding inside the persistence boundary.
//!
//! # Invariants
//! - Full student listings exclude soft-deleted rows.
//! - Updates keyed by an id that matches no row are silent no-ops.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Constraint violations are surfaced unchanged as `RepoError::Constraint`.

use crate::db::migrations::{current_version, latest_version, REQUIRED_TABLES};
use crate::db::DbError;
use crate::model::search::StudentSearchCondition;
use crate::model::status::ApplicationStatus;
use crate::model::student::{CourseId, Student, StudentCourse, StudentId};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, ErrorCode, OptionalExtension, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const STUDENT_SELECT_SQL: &str = "SELECT
    s.id AS id,
    s.name AS name,
    s.kana_name AS kana_name,
    s.nickname AS nickname,
    s.email AS email,
    s.area AS area,
    s.age AS age,
    s.sex AS sex,
    s.remark AS remark,
    s.is_deleted AS is_deleted
FROM students s";

const COURSE_SELECT_SQL: &str = "SELECT
    c.id AS id,
    c.student_id AS student_id,
    c.course_name AS course_name,
    c.start_at AS start_at,
    c.end_at AS end_at
FROM students_courses c";

const COURSE_WITH_STATUS_SELECT_SQL: &str = "SELECT
    c.id AS id,
    c.student_id AS student_id,
    c.course_name AS course_name,
    c.start_at AS start_at,
    c.end_at AS end_at,
    a.id AS status_id,
    a.student_course_id AS student_course_id,
    a.status AS status,
    a.status_code AS status_code
FROM students_courses c
LEFT JOIN students_courses_status a ON a.student_course_id = c.id";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for roster persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    /// Transport or bootstrap failure.
    Db(DbError),
    /// Uniqueness, foreign-key or check violation reported by the store.
    Constraint(rusqlite::Error),
    /// Lookup by student id found nothing.
    NotFound(StudentId),
    /// Persisted or supplied row cannot be mapped to a valid record.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Constraint(err) => write!(f, "constraint violation: {err}"),
            Self::NotFound(id) => write!(f, "student not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid roster data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "student repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "student repository requires table `{table}`")
            }
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Constraint(err) => Some(err),
            Self::NotFound(_)
            | Self::InvalidData(_)
            | Self::UninitializedConnection { .. }
            | Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        match value {
            DbError::Sqlite(err) => Self::from(err),
            other => Self::Db(other),
        }
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        match value.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => Self::Constraint(value),
            _ => Self::Db(DbError::Sqlite(value)),
        }
    }
}

/// Persistence port consumed by `StudentService`.
///
/// `begin`/`commit`/`rollback` scope a sequence of writes into one store
/// transaction. Update methods return whether a row matched the key.
pub trait StudentRepository {
    fn begin(&self) -> RepoResult<()>;
    fn commit(&self) -> RepoResult<()>;
    fn rollback(&self) -> RepoResult<()>;

    /// Lists every student that is not soft-deleted.
    fn find_all_students(&self) -> RepoResult<Vec<Student>>;
    /// Loads one student, deleted or not. Missing ids return `NotFound`.
    fn find_student_by_id(&self, id: StudentId) -> RepoResult<Student>;
    /// Lists every course with its status already attached.
    fn find_all_courses(&self) -> RepoResult<Vec<StudentCourse>>;
    /// Lists one student's courses without statuses.
    fn find_courses_by_student_id(&self, id: StudentId) -> RepoResult<Vec<StudentCourse>>;
    fn find_status_by_course_id(
        &self,
        course_id: CourseId,
    ) -> RepoResult<Option<ApplicationStatus>>;

    fn insert_student(&self, student: &Student) -> RepoResult<()>;
    /// Inserts one course and returns its store-generated id.
    fn insert_course(&self, course: &StudentCourse) -> RepoResult<CourseId>;
    fn insert_status(&self, status: &ApplicationStatus) -> RepoResult<()>;

    fn update_student(&self, student: &Student) -> RepoResult<bool>;
    fn update_course(&self, course: &StudentCourse) -> RepoResult<bool>;
    fn update_status(&self, status: &ApplicationStatus) -> RepoResult<bool>;

    fn search_students(&self, condition: &StudentSearchCondition) -> RepoResult<Vec<Student>>;
}

/// SQLite-backed student repository.
pub struct SqliteStudentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteStudentRepository<'conn> {
    /// Creates a repository from a migrated connection.
    ///
    /// # Errors
    /// - `UninitializedConnection` when the schema version is not the latest.
    /// - `MissingRequiredTable` when a roster table is absent.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl StudentRepository for SqliteStudentRepository<'_> {
    fn begin(&self) -> RepoResult<()> {
        self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(())
    }

    fn commit(&self) -> RepoResult<()> {
        self.conn.execute_batch("COMMIT;")?;
        Ok(())
    }

    fn rollback(&self) -> RepoResult<()> {
        if !self.conn.is_autocommit() {
            self.conn.execute_batch("ROLLBACK;")?;
        }
        Ok(())
    }

    fn find_all_students(&self) -> RepoResult<Vec<Student>> {
        let mut stmt = self.conn.prepare(&format!(
            "{STUDENT_SELECT_SQL}
             WHERE s.is_deleted = 0
             ORDER BY s.rowid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn find_student_by_id(&self, id: StudentId) -> RepoResult<Student> {
        let mut stmt = self
            .conn
            .prepare(&format!("{STUDENT_SELECT_SQL} WHERE s.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        match rows.next()? {
            Some(row) => parse_student_row(row),
            None => Err(RepoError::NotFound(id)),
        }
    }

    fn find_all_courses(&self) -> RepoResult<Vec<StudentCourse>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COURSE_WITH_STATUS_SELECT_SQL} ORDER BY c.id ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            let mut course = parse_course_row(row)?;
            course.application_status = parse_joined_status(row)?;
            courses.push(course);
        }
        Ok(courses)
    }

    fn find_courses_by_student_id(&self, id: StudentId) -> RepoResult<Vec<StudentCourse>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COURSE_SELECT_SQL}
             WHERE c.student_id = ?1
             ORDER BY c.id ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut courses = Vec::new();
        while let Some(row) = rows.next()? {
            courses.push(parse_course_row(row)?);
        }
        Ok(courses)
    }

    fn find_status_by_course_id(
        &self,
        course_id: CourseId,
    ) -> RepoResult<Option<ApplicationStatus>> {
        let raw = self
            .conn
            .query_row(
                "SELECT id, student_course_id, status, status_code
                 FROM students_courses_status
                 WHERE student_course_id = ?1;",
                [course_id],
                |row| {
                    Ok(RawStatus {
                        id: row.get("id")?,
                        student_course_id: row.get("student_course_id")?,
                        label: row.get("status")?,
                        code: row.get("status_code")?,
                    })
                },
            )
            .optional()?;
        raw.map(RawStatus::into_status).transpose()
    }

    fn insert_student(&self, student: &Student) -> RepoResult<()> {
        let id = student
            .id
            .ok_or_else(|| RepoError::InvalidData("student id must be assigned".to_string()))?;

        self.conn.execute(
            "INSERT INTO students (
                id,
                name,
                kana_name,
                nickname,
                email,
                area,
                age,
                sex,
                remark,
                is_deleted
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0);",
            params![
                id.to_string(),
                student.name.as_str(),
                student.kana_name.as_str(),
                student.nickname.as_deref(),
                student.email.as_str(),
                student.area.as_str(),
                i64::from(student.age),
                student.sex.as_str(),
                student.remark.as_deref(),
            ],
        )?;
        Ok(())
    }

    fn insert_course(&self, course: &StudentCourse) -> RepoResult<CourseId> {
        let student_id = course.student_id.ok_or_else(|| {
            RepoError::InvalidData("course student_id must be assigned".to_string())
        })?;
        let (Some(start_at), Some(end_at)) = (course.start_at, course.end_at) else {
            return Err(RepoError::InvalidData(
                "course start_at and end_at must be assigned".to_string(),
            ));
        };

        self.conn.execute(
            "INSERT INTO students_courses (student_id, course_name, start_at, end_at)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                student_id.to_string(),
                course.course_name.as_str(),
                start_at,
                end_at,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn insert_status(&self, status: &ApplicationStatus) -> RepoResult<()> {
        let (Some(id), Some(course_id)) = (status.id, status.student_course_id) else {
            return Err(RepoError::InvalidData(
                "status id and student_course_id must be assigned".to_string(),
            ));
        };

        self.conn.execute(
            "INSERT INTO students_courses_status (id, student_course_id, status, status_code)
             VALUES (?1, ?2, ?3, ?4);",
            params![id.to_string(), course_id, status.label(), status.code()],
        )?;
        Ok(())
    }

    fn update_student(&self, student: &Student) -> RepoResult<bool> {
        let Some(id) = student.id else {
            return Ok(false);
        };

        let changed = self.conn.execute(
            "UPDATE students
             SET
                name = ?1,
                kana_name = ?2,
                nickname = ?3,
                email = ?4,
                area = ?5,
                age = ?6,
                sex = ?7,
                remark = ?8,
                is_deleted = ?9
             WHERE id = ?10;",
            params![
                student.name.as_str(),
                student.kana_name.as_str(),
                student.nickname.as_deref(),
                student.email.as_str(),
                student.area.as_str(),
                i64::from(student.age),
                student.sex.as_str(),
                student.remark.as_deref(),
                bool_to_int(student.deleted),
                id.to_string(),
            ],
        )?;
        Ok(changed > 0)
    }

    fn update_course(&self, course: &StudentCourse) -> RepoResult<bool> {
        let Some(id) = course.id else {
            return Ok(false);
        };

        let changed = self.conn.execute(
            "UPDATE students_courses SET course_name = ?1 WHERE id = ?2;",
            params![course.course_name.as_str(), id],
        )?;
        Ok(changed > 0)
    }

    fn update_status(&self, status: &ApplicationStatus) -> RepoResult<bool> {
        let Some(id) = status.id else {
            return Ok(false);
        };

        let changed = self.conn.execute(
            "UPDATE students_courses_status
             SET status = ?1, status_code = ?2
             WHERE id = ?3;",
            params![status.label(), status.code(), id.to_string()],
        )?;
        Ok(changed > 0)
    }

    fn search_students(&self, condition: &StudentSearchCondition) -> RepoResult<Vec<Student>> {
        let condition = condition.normalized();
        let mut sql = format!("{STUDENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        for (column, value) in [
            ("s.name", &condition.name),
            ("s.email", &condition.email),
            ("s.area", &condition.area),
        ] {
            if let Some(value) = value {
                sql.push_str(&format!(" AND instr({column}, ?) > 0"));
                bind_values.push(Value::Text(value.clone()));
            }
        }

        if let Some(deleted) = condition.deleted {
            sql.push_str(" AND s.is_deleted = ?");
            bind_values.push(Value::Integer(bool_to_int(deleted)));
        }
        if let Some(min_age) = condition.min_age {
            sql.push_str(" AND s.age >= ?");
            bind_values.push(Value::Integer(i64::from(min_age)));
        }
        if let Some(max_age) = condition.max_age {
            sql.push_str(" AND s.age <= ?");
            bind_values.push(Value::Integer(i64::from(max_age)));
        }
        if let Some(sex) = condition.sex.as_ref() {
            sql.push_str(" AND s.sex = ?");
            bind_values.push(Value::Text(sex.clone()));
        }

        if condition.course_name.is_some() || condition.status.is_some() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM students_courses c
                    LEFT JOIN students_courses_status a ON a.student_course_id = c.id
                    WHERE c.student_id = s.id",
            );
            if let Some(course_name) = condition.course_name.as_ref() {
                sql.push_str(" AND instr(c.course_name, ?) > 0");
                bind_values.push(Value::Text(course_name.clone()));
            }
            if let Some(status) = condition.status.as_ref() {
                sql.push_str(" AND a.status = ?");
                bind_values.push(Value::Text(status.clone()));
            }
            sql.push(')');
        }

        sql.push_str(" ORDER BY s.rowid ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }
}

struct RawStatus {
    id: String,
    student_course_id: CourseId,
    label: String,
    code: i64,
}

impl RawStatus {
    fn into_status(self) -> RepoResult<ApplicationStatus> {
        let id = parse_uuid(&self.id, "students_courses_status.id")?;
        let mut status = ApplicationStatus::from_label(self.label);
        if i64::from(status.code()) != self.code {
            return Err(RepoError::InvalidData(format!(
                "status label `{}` disagrees with status_code `{}` for status {id}",
                status.label().unwrap_or_default(),
                self.code
            )));
        }
        status.id = Some(id);
        status.student_course_id = Some(self.student_course_id);
        Ok(status)
    }
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "students.id")?;

    let age_value: i64 = row.get("age")?;
    let age = u32::try_from(age_value).map_err(|_| {
        RepoError::InvalidData(format!("invalid age `{age_value}` in students.age"))
    })?;

    Ok(Student {
        id: Some(id),
        name: row.get("name")?,
        kana_name: row.get("kana_name")?,
        nickname: row.get("nickname")?,
        email: row.get("email")?,
        area: row.get("area")?,
        age,
        sex: row.get("sex")?,
        remark: row.get("remark")?,
        deleted: int_to_bool(row.get("is_deleted")?, "students.is_deleted")?,
    })
}

fn parse_course_row(row: &Row<'_>) -> RepoResult<StudentCourse> {
    let student_id_text: String = row.get("student_id")?;
    let start_at: NaiveDateTime = row.get("start_at")?;
    let end_at: NaiveDateTime = row.get("end_at")?;

    Ok(StudentCourse {
        id: Some(row.get("id")?),
        student_id: Some(parse_uuid(&student_id_text, "students_courses.student_id")?),
        course_name: row.get("course_name")?,
        start_at: Some(start_at),
        end_at: Some(end_at),
        application_status: None,
    })
}

fn parse_joined_status(row: &Row<'_>) -> RepoResult<Option<ApplicationStatus>> {
    let Some(id) = row.get::<_, Option<String>>("status_id")? else {
        return Ok(None);
    };
    let raw = RawStatus {
        id,
        student_course_id: row.get("student_course_id")?,
        label: row.get("status")?,
        code: row.get("status_code")?,
    };
    raw.into_status().map(Some)
}

fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        let exists: i64 = conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table],
            |row| row.get(0),
        )?;
        if exists != 1 {
            return Err(RepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}
