use anyhow::Result;
use rusqlite::{Connection, Row};

use safemove_types::models::{Student, StudentStatus};

use super::{OptionalExt, status_column};
use crate::Database;

const STUDENT_COLUMNS: &str = "id, name, phone, image, status";

impl Database {
    pub fn create_student(&self, name: &str, phone: &str, image: Option<&str>) -> Result<Student> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO students (name, phone, image, status) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![name, phone, image, StudentStatus::Inside.as_str()],
            )?;
            Ok(Student {
                id: conn.last_insert_rowid(),
                name: name.to_string(),
                phone: phone.to_string(),
                image: image.map(str::to_string),
                status: StudentStatus::Inside,
            })
        })
    }

    pub fn get_student(&self, id: i64) -> Result<Option<Student>> {
        self.with_conn(|conn| query_student(conn, id))
    }

    /// Students whose name contains `name`, optionally excluding one status.
    pub fn find_students(
        &self,
        name: &str,
        status_not: Option<StudentStatus>,
    ) -> Result<Vec<Student>> {
        let pattern = format!("%{}%", name);

        self.with_conn(|conn| {
            let rows = match status_not {
                Some(status) => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {STUDENT_COLUMNS} FROM students
                         WHERE name LIKE ?1 AND status != ?2
                         ORDER BY name, id"
                    ))?;
                    let rows = stmt
                        .query_map(rusqlite::params![pattern, status.as_str()], student_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
                None => {
                    let mut stmt = conn.prepare(&format!(
                        "SELECT {STUDENT_COLUMNS} FROM students WHERE name LIKE ?1 ORDER BY name, id"
                    ))?;
                    let rows = stmt
                        .query_map([pattern], student_from_row)?
                        .collect::<std::result::Result<Vec<_>, _>>()?;
                    rows
                }
            };
            Ok(rows)
        })
    }

    /// Returns false when no such student exists.
    pub fn set_student_status(&self, id: i64, status: StudentStatus) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let changed = conn.execute(
                "UPDATE students SET status = ?1 WHERE id = ?2",
                rusqlite::params![status.as_str(), id],
            )?;
            Ok(changed == 1)
        })
    }
}

pub(crate) fn query_student(conn: &Connection, id: i64) -> Result<Option<Student>> {
    conn.query_row(
        &format!("SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"),
        [id],
        student_from_row,
    )
    .optional()
}

pub(crate) fn student_exists(conn: &Connection, id: i64) -> Result<bool> {
    let exists = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM students WHERE id = ?1)",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists)
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<Student> {
    Ok(Student {
        id: row.get(0)?,
        name: row.get(1)?,
        phone: row.get(2)?,
        image: row.get(3)?,
        status: status_column(row, 4)?,
    })
}
