use chrono::NaiveDate;
use roster_core::db::migrations::latest_version;
use roster_core::db::open_db_in_memory;
use roster_core::{
    ApplicationStatus, RepoError, SqliteStudentRepository, StatusType, Student, StudentCourse,
    StudentRepository, StudentSearchCondition,
};
use rusqlite::Connection;
use uuid::Uuid;

fn student(name: &str, email: &str, area: &str, age: u32, sex: &str) -> Student {
    Student {
        id: Some(Uuid::new_v4()),
        name: name.to_string(),
        kana_name: format!("{name}カナ"),
        email: email.to_string(),
        area: area.to_string(),
        age,
        sex: sex.to_string(),
        ..Student::default()
    }
}

fn course_for(student: &Student, name: &str) -> StudentCourse {
    let start = NaiveDate::from_ymd_opt(2025, 4, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    let end = NaiveDate::from_ymd_opt(2025, 10, 1)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap();
    StudentCourse {
        student_id: student.id,
        start_at: Some(start),
        end_at: Some(end),
        ..StudentCourse::new(name)
    }
}

fn insert_status(repo: &SqliteStudentRepository<'_>, course_id: i64, status: StatusType) {
    let mut value = ApplicationStatus::from_variant(status);
    value.id = Some(Uuid::new_v4());
    value.student_course_id = Some(course_id);
    repo.insert_status(&value).unwrap();
}

#[test]
fn insert_and_find_student_roundtrip() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut stored = student("山田", "yamada@example.com", "東京", 20, "男性");
    stored.remark = Some("転職希望".to_string());
    repo.insert_student(&stored).unwrap();

    let loaded = repo.find_student_by_id(stored.id.unwrap()).unwrap();
    assert_eq!(loaded, stored);
}

#[test]
fn find_student_by_unknown_id_returns_not_found() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let id = Uuid::new_v4();
    let err = repo.find_student_by_id(id).unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));
}

#[test]
fn find_all_students_excludes_soft_deleted_rows() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let active = student("在籍", "active@example.com", "東京", 20, "男性");
    let mut deleted = student("退会", "gone@example.com", "大阪", 30, "女性");
    repo.insert_student(&active).unwrap();
    repo.insert_student(&deleted).unwrap();
    deleted.soft_delete();
    assert!(repo.update_student(&deleted).unwrap());

    let listed = repo.find_all_students().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, active.id);

    let still_there = repo.find_student_by_id(deleted.id.unwrap()).unwrap();
    assert!(still_there.deleted);
}

#[test]
fn courses_come_back_with_generated_ids_and_resolved_statuses() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let owner = student("山田", "yamada@example.com", "東京", 20, "男性");
    repo.insert_student(&owner).unwrap();
    let java_id = repo.insert_course(&course_for(&owner, "Java")).unwrap();
    let aws_id = repo.insert_course(&course_for(&owner, "AWS")).unwrap();
    assert_ne!(java_id, aws_id);
    insert_status(&repo, java_id, StatusType::Confirmed);

    let all = repo.find_all_courses().unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, Some(java_id));
    assert_eq!(
        all[0].application_status.as_ref().unwrap().label(),
        Some("本申込")
    );
    assert!(all[1].application_status.is_none());

    let by_student = repo.find_courses_by_student_id(owner.id.unwrap()).unwrap();
    assert_eq!(by_student.len(), 2);
    assert!(by_student.iter().all(|c| c.application_status.is_none()));
    assert_eq!(by_student[1].start_at, course_for(&owner, "x").start_at);

    let status = repo.find_status_by_course_id(java_id).unwrap().unwrap();
    assert_eq!(status.student_course_id, Some(java_id));
    assert_eq!(status.code(), 2);
    assert!(repo.find_status_by_course_id(aws_id).unwrap().is_none());
}

#[test]
fn duplicate_email_is_a_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.insert_student(&student("一", "same@example.com", "東京", 20, "男性"))
        .unwrap();
    let err = repo
        .insert_student(&student("二", "same@example.com", "東京", 21, "男性"))
        .unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)), "unexpected: {err}");
}

#[test]
fn course_for_unknown_student_is_a_constraint_violation() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let ghost = student("幽霊", "ghost@example.com", "東京", 20, "男性");
    let err = repo.insert_course(&course_for(&ghost, "Java")).unwrap_err();
    assert!(matches!(err, RepoError::Constraint(_)), "unexpected: {err}");
}

#[test]
fn insert_without_assigned_ids_is_rejected() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let mut unassigned = student("未採番", "none@example.com", "東京", 20, "男性");
    unassigned.id = None;
    assert!(matches!(
        repo.insert_student(&unassigned),
        Err(RepoError::InvalidData(_))
    ));
    assert!(matches!(
        repo.insert_course(&StudentCourse::new("Java")),
        Err(RepoError::InvalidData(_))
    ));
    assert!(matches!(
        repo.insert_status(&ApplicationStatus::from_variant(StatusType::Provisional)),
        Err(RepoError::InvalidData(_))
    ));
}

#[test]
fn updates_of_missing_rows_are_silent_no_ops() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let ghost = student("幽霊", "ghost@example.com", "東京", 20, "男性");
    assert!(!repo.update_student(&ghost).unwrap());

    let mut course = course_for(&ghost, "Java");
    course.id = Some(4242);
    assert!(!repo.update_course(&course).unwrap());
    course.id = None;
    assert!(!repo.update_course(&course).unwrap());

    let mut status = ApplicationStatus::from_variant(StatusType::Completed);
    assert!(!repo.update_status(&status).unwrap());
    status.id = Some(Uuid::new_v4());
    assert!(!repo.update_status(&status).unwrap());
}

#[test]
fn update_course_changes_name_only_and_status_keeps_code_in_sync() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let owner = student("山田", "yamada@example.com", "東京", 20, "男性");
    repo.insert_student(&owner).unwrap();
    let mut course = course_for(&owner, "Java");
    let course_id = repo.insert_course(&course).unwrap();
    insert_status(&repo, course_id, StatusType::Provisional);

    course.id = Some(course_id);
    course.course_name = "Java 応用".to_string();
    course.start_at = None;
    assert!(repo.update_course(&course).unwrap());

    let mut status = repo.find_status_by_course_id(course_id).unwrap().unwrap();
    status.set_code(4);
    assert!(repo.update_status(&status).unwrap());

    let reloaded = repo.find_all_courses().unwrap();
    assert_eq!(reloaded[0].course_name, "Java 応用");
    assert!(reloaded[0].start_at.is_some());
    let reloaded_status = reloaded[0].application_status.as_ref().unwrap();
    assert_eq!(reloaded_status.label(), Some("受講終了"));
    assert_eq!(reloaded_status.code(), 4);
}

#[test]
fn search_applies_every_present_filter() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    let yamada = student("山田太郎", "yamada@example.com", "東京都", 20, "男性");
    let sato = student("佐藤花子", "sato@example.jp", "大阪府", 35, "女性");
    let mut kato = student("加藤次郎", "kato@example.com", "東京都", 50, "男性");
    for value in [&yamada, &sato, &kato] {
        repo.insert_student(value).unwrap();
    }
    kato.soft_delete();
    repo.update_student(&kato).unwrap();

    let java = repo.insert_course(&course_for(&yamada, "Java基礎")).unwrap();
    insert_status(&repo, java, StatusType::InProgress);
    let aws = repo.insert_course(&course_for(&sato, "AWS入門")).unwrap();
    insert_status(&repo, aws, StatusType::Provisional);

    let ids = |condition: StudentSearchCondition| -> Vec<_> {
        repo.search_students(&condition)
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect()
    };

    assert_eq!(
        ids(StudentSearchCondition::default()),
        vec![yamada.id, sato.id, kato.id]
    );
    assert_eq!(
        ids(StudentSearchCondition {
            area: Some("東京".to_string()),
            deleted: Some(false),
            ..StudentSearchCondition::default()
        }),
        vec![yamada.id]
    );
    assert_eq!(
        ids(StudentSearchCondition {
            min_age: Some(30),
            max_age: Some(50),
            sex: Some("男性".to_string()),
            ..StudentSearchCondition::default()
        }),
        vec![kato.id]
    );
    assert_eq!(
        ids(StudentSearchCondition {
            course_name: Some("AWS".to_string()),
            ..StudentSearchCondition::default()
        }),
        vec![sato.id]
    );
    assert_eq!(
        ids(StudentSearchCondition {
            status: Some("受講中".to_string()),
            email: Some("example.com".to_string()),
            ..StudentSearchCondition::default()
        }),
        vec![yamada.id]
    );
    assert_eq!(
        ids(StudentSearchCondition {
            name: Some("  ".to_string()),
            status: Some("受講終了".to_string()),
            ..StudentSearchCondition::default()
        }),
        Vec::<Option<Uuid>>::new()
    );
}

#[test]
fn rollback_discards_writes_since_begin() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteStudentRepository::try_new(&conn).unwrap();

    repo.begin().unwrap();
    repo.insert_student(&student("一時", "tmp@example.com", "東京", 20, "男性"))
        .unwrap();
    repo.rollback().unwrap();
    repo.rollback().unwrap();

    assert!(repo.find_all_students().unwrap().is_empty());
}

#[test]
fn repository_rejects_uninitialized_connection() {
    let conn = Connection::open_in_memory().unwrap();

    match SqliteStudentRepository::try_new(&conn) {
        Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version: 0,
        }) => assert_eq!(expected_version, latest_version()),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("expected uninitialized connection error"),
    }
}

#[test]
fn repository_rejects_connection_without_students_table() {
    let conn = Connection::open_in_memory().unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", latest_version()))
        .unwrap();

    assert!(matches!(
        SqliteStudentRepository::try_new(&conn),
        Err(RepoError::MissingRequiredTable("students"))
    ));
}
