use roster_core::{ApplicationStatus, StatusType, Student, StudentConverter, StudentCourse};
use uuid::Uuid;

fn student(id: Uuid, name: &str) -> Student {
    Student {
        id: Some(id),
        name: name.to_string(),
        ..Student::default()
    }
}

fn course(id: i64, student_id: Uuid, name: &str) -> StudentCourse {
    StudentCourse {
        id: Some(id),
        student_id: Some(student_id),
        ..StudentCourse::new(name)
    }
}

#[test]
fn courses_are_grouped_per_student_in_original_order() {
    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();

    let details = StudentConverter::convert(
        vec![student(s1, "one"), student(s2, "two")],
        vec![
            course(1, s1, "C1"),
            course(3, s2, "C2"),
            course(2, s2, "C3"),
        ],
    );

    assert_eq!(details.len(), 2);
    assert_eq!(details[0].student.id, Some(s1));
    let first: Vec<_> = details[0].courses.iter().map(|c| c.course_name.as_str()).collect();
    assert_eq!(first, ["C1"]);
    assert_eq!(details[1].student.id, Some(s2));
    let second: Vec<_> = details[1].courses.iter().map(|c| c.course_name.as_str()).collect();
    assert_eq!(second, ["C2", "C3"]);
}

#[test]
fn student_without_courses_gets_empty_list() {
    let s1 = Uuid::new_v4();
    let details = StudentConverter::convert(vec![student(s1, "alone")], Vec::new());

    assert_eq!(details.len(), 1);
    assert!(details[0].courses.is_empty());
}

#[test]
fn unmatched_courses_are_dropped_and_empty_inputs_are_safe() {
    let details = StudentConverter::convert(
        vec![student(Uuid::new_v4(), "nobody's")],
        vec![course(1, Uuid::new_v4(), "orphan")],
    );
    assert!(details[0].courses.is_empty());

    assert!(StudentConverter::convert(Vec::new(), Vec::new()).is_empty());
}

#[test]
fn statuses_travel_with_their_courses() {
    let s1 = Uuid::new_v4();
    let with_status =
        course(7, s1, "Java").with_status(ApplicationStatus::from_variant(StatusType::InProgress));

    let details = StudentConverter::convert(vec![student(s1, "one")], vec![with_status]);

    let status = details[0].courses[0].application_status.as_ref().unwrap();
    assert_eq!(status.label(), Some("受講中"));
    assert_eq!(status.code(), 3);
}
