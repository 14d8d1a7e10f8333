mod common;

use anyhow::Result;
use axum::http::StatusCode;
use common::{acquire_db_lock, TestApp};
use serde_json::json;

#[tokio::test]
async fn student_complaint_is_routed_answered_and_resolved() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (_, student) = app
        .signed_in("rep@uni.test", "Class Rep", "student", "FICT")
        .await?;
    let (lecturer_id, lecturer) = app
        .signed_in("lecturer@uni.test", "Lerato M", "lecturer", "FICT")
        .await?;
    let (_, prl) = app
        .signed_in("prl@uni.test", "Principal", "prl", "FICT")
        .await?;
    let (_, other_prl) = app
        .signed_in("prl2@uni.test", "Other Principal", "prl", "FBMG")
        .await?;

    let filed = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Late starts",
                "description": "Lectures start 20 minutes late every week",
                "against_user_id": lecturer_id,
                "against_role": "lecturer",
                "is_anonymous": true
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(filed.status, StatusCode::CREATED);
    let complaint = filed.json()?["complaint"].clone();
    assert_eq!(complaint["status"], "pending");
    assert_eq!(complaint["category"], "general");
    assert_eq!(complaint["complainant_role"], "student");
    let complaint_id = complaint["id"].as_str().unwrap().to_string();

    let mine = app.get("/api/complaints/my-complaints", Some(&student)).await?;
    let body = mine.json()?;
    assert_eq!(body["complaints"][0]["counterpart_name"], "Lerato M");

    let queue = app.get("/api/complaints/for-review", Some(&prl)).await?;
    let body = queue.json()?;
    assert_eq!(body["complaints"].as_array().unwrap().len(), 1);
    assert_eq!(body["complaints"][0]["counterpart_name"], "Anonymous");

    let foreign = app.get("/api/complaints/for-review", Some(&other_prl)).await?;
    assert_eq!(foreign.json()?["complaints"].as_array().unwrap().len(), 0);

    let not_reviewer = app
        .post_json(
            &format!("/api/complaints/{complaint_id}/response"),
            &json!({ "response_text": "I disagree" }),
            Some(&lecturer),
        )
        .await?;
    assert_eq!(not_reviewer.status, StatusCode::FORBIDDEN);

    let answered = app
        .post_json(
            &format!("/api/complaints/{complaint_id}/response"),
            &json!({ "response_text": "Spoke to the lecturer; start times fixed." }),
            Some(&prl),
        )
        .await?;
    assert_eq!(answered.status, StatusCode::CREATED);
    assert_eq!(answered.json()?["complaint_status"], "resolved");

    let responses = app
        .get(
            &format!("/api/complaints/{complaint_id}/responses"),
            Some(&student),
        )
        .await?;
    let body = responses.json()?;
    assert_eq!(body["responses"][0]["responder_name"], "Principal");
    assert_eq!(body["responses"][0]["responder_role"], "prl");

    let hidden = app
        .get(
            &format!("/api/complaints/{complaint_id}/responses"),
            Some(&lecturer),
        )
        .await?;
    assert_eq!(hidden.status, StatusCode::FORBIDDEN);

    let reopened = app
        .patch_json(
            &format!("/api/complaints/{complaint_id}"),
            &json!({ "status": "in_review" }),
            Some(&prl),
        )
        .await?;
    assert_eq!(reopened.status, StatusCode::BAD_REQUEST);

    let reprioritised = app
        .patch_json(
            &format!("/api/complaints/{complaint_id}"),
            &json!({ "priority": "high" }),
            Some(&prl),
        )
        .await?;
    assert_eq!(reprioritised.status, StatusCode::OK);
    assert_eq!(reprioritised.json()?["complaint"]["priority"], "high");

    let notified = app
        .get("/api/users/notifications/me", Some(&student))
        .await?;
    assert_eq!(notified.json()?["notifications"].as_array().unwrap().len(), 1);

    app.cleanup().await?;
    Ok(())
}

#[tokio::test]
async fn complaint_routing_rules_are_enforced() -> Result<()> {
    let _lock = acquire_db_lock().await;
    let Some(app) = TestApp::new().await? else {
        return Ok(());
    };

    let (student_id, student) = app
        .signed_in("rep@uni.test", "Class Rep", "student", "FICT")
        .await?;
    let (prl_id, _) = app
        .signed_in("prl@uni.test", "Principal", "prl", "FICT")
        .await?;
    let (_, fmg) = app
        .signed_in("fmg@uni.test", "Faculty Manager", "fmg", "FICT")
        .await?;

    let skip_level = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Escalation",
                "description": "Going straight to the top",
                "against_user_id": prl_id,
                "against_role": "prl"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(skip_level.status, StatusCode::BAD_REQUEST);
    assert_eq!(skip_level.error()?, "Invalid complaint route for your role");

    let against_self = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Me",
                "description": "Myself",
                "against_user_id": student_id,
                "against_role": "lecturer"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(against_self.status, StatusCode::BAD_REQUEST);
    assert_eq!(against_self.error()?, "Cannot file complaint against yourself");

    let wrong_role = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Mislabelled",
                "description": "Target is not a lecturer",
                "against_user_id": prl_id,
                "against_role": "lecturer"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(wrong_role.status, StatusCode::BAD_REQUEST);
    assert_eq!(wrong_role.error()?, "Target user is not a lecturer");

    let blank = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": " ",
                "description": "No title",
                "against_user_id": prl_id,
                "against_role": "lecturer"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(blank.status, StatusCode::BAD_REQUEST);
    assert_eq!(blank.error()?, "All complaint fields are required");

    let fmg_files = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Nobody above",
                "description": "Faculty management has no escalation target",
                "against_user_id": prl_id,
                "against_role": "pl"
            }),
            Some(&fmg),
        )
        .await?;
    assert_eq!(fmg_files.status, StatusCode::FORBIDDEN);

    let unknown_role = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Who?",
                "description": "Not a role at all",
                "against_user_id": prl_id,
                "against_role": "admin"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(unknown_role.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown_role.error()?, "Invalid complaint route for your role");

    let no_target = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "Missing target",
                "description": "Forgot who",
                "against_role": "lecturer"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(no_target.status, StatusCode::BAD_REQUEST);
    assert!(no_target.error()?.contains("against_user_id"));

    let long_title = app
        .post_json(
            "/api/complaints",
            &json!({
                "title": "t".repeat(300),
                "description": "Too wordy",
                "against_user_id": prl_id,
                "against_role": "lecturer"
            }),
            Some(&student),
        )
        .await?;
    assert_eq!(long_title.status, StatusCode::BAD_REQUEST);
    assert_eq!(long_title.error()?, "title must be at most 255 characters");

    let stats = app.get("/api/complaints/stats", Some(&fmg)).await?;
    assert_eq!(stats.json()?["stats"]["total_complaints"], 0);

    app.cleanup().await?;
    Ok(())
}
