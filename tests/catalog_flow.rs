mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, TestApp};
use serde_json::json;

#[tokio::test]
async fn program_leader_manages_courses_classes_and_assignments() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, pl) = app
        .signed_in("pl@uni.test", "Program Leader", "pl", "FICT")
        .await?;
    let (lecturer_id, lecturer) = app
        .signed_in("lecturer@uni.test", "Lerato M", "lecturer", "FICT")
        .await?;
    let student_id = app
        .insert_user("rep@uni.test", "Class Rep", "student", "FICT", true)
        .await?;

    let course = app
        .post_json(
            "/api/courses",
            &json!({ "name": "Data Structures", "code": "DS201", "faculty": "FICT", "credits": 12 }),
            Some(&pl),
        )
        .await?;
    assert_eq!(course.status, StatusCode::CREATED);
    let course_id = course.json()?["course"]["id"].as_str().unwrap().to_string();

    let duplicate = app
        .post_json(
            "/api/courses",
            &json!({ "name": "Copy", "code": "DS201", "faculty": "FICT" }),
            Some(&pl),
        )
        .await?;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.error()?, "Course code already exists");

    let by_lecturer = app
        .post_json(
            "/api/courses",
            &json!({ "name": "Rogue", "code": "RG100", "faculty": "FICT" }),
            Some(&lecturer),
        )
        .await?;
    assert_eq!(by_lecturer.status, StatusCode::FORBIDDEN);

    let class = app
        .post_json(
            "/api/classes",
            &json!({ "name": "BSc CS Year 2", "code": "BSCSM-Y2", "faculty": "FICT", "total_students": 45 }),
            Some(&pl),
        )
        .await?;
    assert_eq!(class.status, StatusCode::CREATED);
    let class_body = class.json()?;
    assert_eq!(class_body["class"]["academic_year"], "2024");
    assert_eq!(class_body["class"]["semester"], "1");
    let class_id = class_body["class"]["id"].as_str().unwrap().to_string();

    let assignment = json!({
        "lecturer_id": lecturer_id,
        "course_id": course_id,
        "class_id": class_id
    });
    let assigned = app
        .post_json("/api/courses/assign", &assignment, Some(&pl))
        .await?;
    assert_eq!(assigned.status, StatusCode::CREATED);

    let again = app
        .post_json("/api/courses/assign", &assignment, Some(&pl))
        .await?;
    assert_eq!(again.status, StatusCode::BAD_REQUEST);

    let to_student = app
        .post_json(
            "/api/courses/assign",
            &json!({ "lecturer_id": student_id, "course_id": course_id, "class_id": class_id }),
            Some(&pl),
        )
        .await?;
    assert_eq!(to_student.status, StatusCode::BAD_REQUEST);

    let assignments = app.get("/api/courses/assignments", Some(&lecturer)).await?;
    let body = assignments.json()?;
    assert_eq!(body["assignments"][0]["lecturer_name"], "Lerato M");
    assert_eq!(body["assignments"][0]["course_code"], "DS201");
    assert_eq!(body["assignments"][0]["class_code"], "BSCSM-Y2");

    let empty_patch = app
        .patch_json(&format!("/api/courses/{course_id}"), &json!({}), Some(&pl))
        .await?;
    assert_eq!(empty_patch.status, StatusCode::BAD_REQUEST);
    assert_eq!(empty_patch.error()?, "No valid fields to update");

    let retired = app
        .patch_json(
            &format!("/api/courses/{course_id}"),
            &json!({ "is_active": false, "description": null }),
            Some(&pl),
        )
        .await?;
    assert_eq!(retired.status, StatusCode::OK);
    assert_eq!(retired.json()?["course"]["is_active"], false);

    let active = app.get("/api/courses/faculty/FICT", Some(&lecturer)).await?;
    assert_eq!(active.json()?["courses"].as_array().unwrap().len(), 0);

    // The student joins the class through their profile.
    let student_token = app.login_token("rep@uni.test").await?;
    let joined = app
        .patch_json(
            "/api/users/profile/me",
            &json!({ "class_id": "BSCSM-Y2" }),
            Some(&student_token),
        )
        .await?;
    assert_eq!(joined.status, StatusCode::OK);

    let roster = app
        .get(&format!("/api/classes/{class_id}/students"), Some(&pl))
        .await?;
    let body = roster.json()?;
    assert_eq!(body["students"].as_array().unwrap().len(), 1);
    assert_eq!(body["students"][0]["name"], "Class Rep");

    let stats = app.get("/api/classes/stats", Some(&pl)).await?;
    assert_eq!(stats.json()?["stats"]["total_students"], 45);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn ratings_are_unique_per_rater_and_averaged() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (lecturer_id, _) = app
        .signed_in("lecturer@uni.test", "Lerato M", "lecturer", "FICT")
        .await?;
    let (_, first) = app
        .signed_in("s1@uni.test", "Student One", "student", "FICT")
        .await?;
    let (_, second) = app
        .signed_in("s2@uni.test", "Student Two", "student", "FICT")
        .await?;

    let rating = |value: i64| {
        json!({
            "rated_entity_type": "lecturer",
            "rated_entity_id": lecturer_id,
            "rating_value": value,
            "comment": "Clear explanations"
        })
    };

    let created = app.post_json("/api/ratings", &rating(4), Some(&first)).await?;
    assert_eq!(created.status, StatusCode::CREATED);

    let duplicate = app.post_json("/api/ratings", &rating(2), Some(&first)).await?;
    assert_eq!(duplicate.status, StatusCode::BAD_REQUEST);
    assert_eq!(duplicate.error()?, "You have already rated this lecturer");

    let out_of_range = app.post_json("/api/ratings", &rating(6), Some(&second)).await?;
    assert_eq!(out_of_range.status, StatusCode::BAD_REQUEST);

    app.post_json("/api/ratings", &rating(5), Some(&second))
        .await?;

    let summary = app
        .get(
            &format!("/api/ratings/entity/lecturer/{lecturer_id}"),
            Some(&first),
        )
        .await?;
    let body = summary.json()?;
    assert_eq!(body["total_ratings"], 2);
    assert_eq!(body["average_rating"], 4.5);

    let mine = app.get("/api/ratings/my-ratings", Some(&first)).await?;
    assert_eq!(mine.json()?["ratings"].as_array().unwrap().len(), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn monitoring_gathers_every_dashboard_block() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, fmg) = app
        .signed_in("fmg@uni.test", "Faculty Manager", "fmg", "FICT")
        .await?;
    let (_, lecturer) = app
        .signed_in("lecturer@uni.test", "Lerato M", "lecturer", "FICT")
        .await?;
    app.insert_user("waiting@uni.test", "Waiting Rep", "student", "FICT", false)
        .await?;

    let system = app.get("/api/monitoring/stats", Some(&fmg)).await?;
    assert_eq!(system.status, StatusCode::OK);
    let body = system.json()?;
    assert_eq!(body["users"]["total_users"], 3);
    assert_eq!(body["users"]["pending_students"], 1);
    assert_eq!(body["reports"]["total_reports"], 0);
    assert!(body["recent_reports"].as_array().unwrap().is_empty());

    let faculty = app
        .get("/api/monitoring/stats/faculty/FICT", Some(&fmg))
        .await?;
    let body = faculty.json()?;
    assert_eq!(body["faculty"], "FICT");
    assert_eq!(body["enrolled_students"], 0);

    let denied = app.get("/api/monitoring/stats", Some(&lecturer)).await?;
    assert_eq!(denied.status, StatusCode::FORBIDDEN);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn faculty_management_administers_accounts() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, fmg) = app
        .signed_in("fmg@uni.test", "Faculty Manager", "fmg", "FICT")
        .await?;
    let (_, pl) = app
        .signed_in("pl@uni.test", "Program Leader", "pl", "FICT")
        .await?;

    let created = app
        .post_json(
            "/api/users",
            &json!({
                "email": "newprl@uni.test",
                "password": "another-pass",
                "name": "New Principal",
                "role": "prl",
                "faculty": "FICT"
            }),
            Some(&fmg),
        )
        .await?;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(created.json()?["user"]["is_approved"], true);

    let by_pl = app
        .post_json(
            "/api/users",
            &json!({
                "email": "other@uni.test",
                "password": "another-pass",
                "name": "Other",
                "role": "prl",
                "faculty": "FICT"
            }),
            Some(&pl),
        )
        .await?;
    assert_eq!(by_pl.status, StatusCode::FORBIDDEN);

    let prls = app.get("/api/users/role/prl?faculty=FICT", Some(&pl)).await?;
    assert_eq!(prls.json()?["users"].as_array().unwrap().len(), 1);

    let bulk = app
        .post_json(
            "/api/users/class-reps/approve",
            &json!({ "user_ids": [] }),
            Some(&pl),
        )
        .await?;
    assert_eq!(bulk.status, StatusCode::BAD_REQUEST);
    assert_eq!(bulk.error()?, "User IDs array is required");

    let everyone = app.get("/api/users", Some(&fmg)).await?;
    assert_eq!(everyone.json()?["users"].as_array().unwrap().len(), 3);

    app.cleanup().await?;
    Ok(())
}
