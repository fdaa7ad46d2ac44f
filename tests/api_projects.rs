//! Integration tests per progetti, task e calcolo delle scadenze
//!
//! Test per:
//! - GET/POST /api/projects
//! - GET/PATCH /api/projects/{project_id}
//! - GET/POST /api/projects/{project_id}/tasks
//! - PATCH /api/projects/{project_id}/tasks/{task_id}
//! - NotificationDispatcher::compute_upcoming_deadlines sui dati persistiti

mod common;

#[cfg(test)]
mod project_tests {
    use super::common::*;
    use axum::http::{HeaderName, StatusCode};
    use chrono::{Duration, Utc};
    use portal::entities::DeadlineKind;
    use serde_json::json;
    use sqlx::SqlitePool;

    fn authorization() -> HeaderName {
        HeaderName::from_static("authorization")
    }

    // ============================================================
    // Test per /api/projects
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects")))]
    async fn test_list_projects_scoped_to_owner(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        let own: Vec<serde_json::Value> = server
            .get("/api/projects")
            .add_header(authorization(), alice_auth())
            .await
            .json();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0]["id"], 1);
        assert_eq!(own[0]["status"], "in_progress");

        let all: Vec<serde_json::Value> = server
            .get("/api/projects")
            .add_header(authorization(), admin_auth())
            .await
            .json();
        assert_eq!(all.len(), 2, "Admins see every project");
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_create_project_sets_owner(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        let response = server
            .post("/api/projects")
            .add_header(authorization(), bob_auth())
            .json(&json!({ "title": "Brand book", "userId": ALICE_ID }))
            .await;

        response.assert_status(StatusCode::CREATED);
        let project: serde_json::Value = response.json();
        assert_eq!(project["userId"], BOB_ID, "Owner always comes from the token");
        assert_eq!(project["status"], "new");
        assert!(project["deadline"].is_null());
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users")))]
    async fn test_create_project_rejects_empty_title(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        server
            .post("/api/projects")
            .add_header(authorization(), bob_auth())
            .json(&json!({ "title": "" }))
            .await
            .assert_status_bad_request();
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects")))]
    async fn test_get_and_update_project(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        server
            .get("/api/projects/2")
            .add_header(authorization(), alice_auth())
            .await
            .assert_status_forbidden();

        let response = server
            .patch("/api/projects/1")
            .add_header(authorization(), alice_auth())
            .json(&json!({ "status": "completed" }))
            .await;
        response.assert_status_ok();
        let project: serde_json::Value = response.json();
        assert_eq!(project["status"], "completed");
        assert_eq!(project["title"], "Website redesign", "Missing fields keep their value");
        Ok(())
    }

    // ============================================================
    // Test per /api/projects/{project_id}/tasks
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects")))]
    async fn test_task_lifecycle(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        let response = server
            .post("/api/projects/1/tasks")
            .add_header(authorization(), admin_auth())
            .json(&json!({ "title": "Copywriting" }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let task: serde_json::Value = response.json();
        assert_eq!(task["projectId"], 1);
        assert_eq!(task["status"], "open");
        let task_id = task["id"].as_i64().unwrap();

        let updated: serde_json::Value = server
            .patch(&format!("/api/projects/1/tasks/{}", task_id))
            .add_header(authorization(), alice_auth())
            .json(&json!({ "status": "done" }))
            .await
            .json();
        assert_eq!(updated["status"], "done");

        let tasks: Vec<serde_json::Value> = server
            .get("/api/projects/1/tasks")
            .add_header(authorization(), alice_auth())
            .await
            .json();
        assert_eq!(tasks.len(), 2);
        Ok(())
    }

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects")))]
    async fn test_update_task_of_another_project(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state);

        // il task 1 appartiene al progetto 1
        server
            .patch("/api/projects/2/tasks/1")
            .add_header(authorization(), admin_auth())
            .json(&json!({ "status": "open" }))
            .await
            .assert_status_not_found();
        Ok(())
    }

    // ============================================================
    // Test per il calcolo delle scadenze
    // ============================================================

    #[sqlx::test(fixtures(path = "../fixtures", scripts("users", "projects")))]
    async fn test_upcoming_deadlines_from_storage(pool: SqlitePool) -> sqlx::Result<()> {
        let (state, _uploads) = create_test_state(&pool);
        let server = create_test_server(state.clone());
        let now = Utc::now();

        // progetto entro la finestra, task oltre la finestra, task completato entro la finestra
        server
            .patch("/api/projects/1")
            .add_header(authorization(), alice_auth())
            .json(&json!({ "deadline": now + Duration::days(3) }))
            .await
            .assert_status_ok();
        server
            .post("/api/projects/1/tasks")
            .add_header(authorization(), alice_auth())
            .json(&json!({ "title": "Launch", "deadline": now + Duration::days(10) }))
            .await
            .assert_status(StatusCode::CREATED);
        server
            .post("/api/projects/1/tasks")
            .add_header(authorization(), alice_auth())
            .json(&json!({ "title": "Review", "status": "done", "deadline": now + Duration::days(1) }))
            .await
            .assert_status(StatusCode::CREATED);
        let soon: serde_json::Value = server
            .post("/api/projects/1/tasks")
            .add_header(authorization(), alice_auth())
            .json(&json!({ "title": "Sign-off", "deadline": now + Duration::days(2) }))
            .await
            .json();

        let deadlines = state
            .notifier
            .compute_upcoming_deadlines(ALICE_ID)
            .await
            .expect("deadlines");

        assert_eq!(deadlines.len(), 2);
        assert_eq!(deadlines[0].kind, DeadlineKind::Task);
        assert_eq!(deadlines[0].id as i64, soon["id"].as_i64().unwrap());
        assert_eq!(deadlines[0].project_title, "Website redesign");
        assert_eq!(deadlines[1].kind, DeadlineKind::Project);
        assert_eq!(deadlines[1].id, 1);

        // bob non vede le scadenze di alice
        let other = state
            .notifier
            .compute_upcoming_deadlines(BOB_ID)
            .await
            .expect("deadlines");
        assert!(other.is_empty());
        Ok(())
    }
}
