use chrono::Utc;
use sqlx::SqlitePool;
use validator::Validate;

use crate::error::AppError;
use crate::models::task::parse_due_date;
use crate::models::{NewTask, Task, TaskChanges};
use crate::policy::{Authorizer, TaskAction, TaskPolicy};

/// The caller's tasks, newest first.
pub async fn list_tasks(pool: &SqlitePool, user_id: i64) -> Result<Vec<Task>, AppError> {
    let tasks = sqlx::query_as::<_, Task>(
        "SELECT id, user_id, title, description, due_date, completed, created_at, updated_at
         FROM tasks WHERE user_id = $1
         ORDER BY created_at DESC, id DESC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(tasks)
}

/// Validates `input` and stores it as a new, incomplete task owned by `user_id`.
/// Nothing is written when validation fails.
pub async fn create_task(pool: &SqlitePool, user_id: i64, input: NewTask) -> Result<Task, AppError> {
    input.validate()?;

    let title = input
        .title
        .ok_or_else(|| AppError::invalid_field("title", "required", "The title field is required."))?;
    let description = input.description.filter(|d| !d.trim().is_empty());
    let due_date = input.due_date.as_deref().and_then(parse_due_date);
    let now = Utc::now();

    let task = sqlx::query_as::<_, Task>(
        "INSERT INTO tasks (user_id, title, description, due_date, completed, created_at, updated_at)
         VALUES ($1, $2, $3, $4, FALSE, $5, $5)
         RETURNING id, user_id, title, description, due_date, completed, created_at, updated_at",
    )
    .bind(user_id)
    .bind(title)
    .bind(description)
    .bind(due_date)
    .bind(now)
    .fetch_one(pool)
    .await?;

    log::info!("user {} created task {}", user_id, task.id);
    Ok(task)
}

/// Looks a task up by id regardless of its owner.
pub async fn find_task(pool: &SqlitePool, task_id: i64) -> Result<Option<Task>, AppError> {
    let task = sqlx::query_as::<_, Task>(
        "SELECT id, user_id, title, description, due_date, completed, created_at, updated_at
         FROM tasks WHERE id = $1",
    )
    .bind(task_id)
    .fetch_optional(pool)
    .await?;

    Ok(task)
}

// Unknown ids are NotFound; known ids owned by someone else are Forbidden.
async fn authorized_task(
    pool: &SqlitePool,
    user_id: i64,
    task_id: i64,
    action: TaskAction,
) -> Result<Task, AppError> {
    let task = find_task(pool, task_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Task not found".into()))?;
    TaskPolicy.authorize(user_id, action, &task)?;
    Ok(task)
}

pub async fn get_task(pool: &SqlitePool, user_id: i64, task_id: i64) -> Result<Task, AppError> {
    authorized_task(pool, user_id, task_id, TaskAction::View).await
}

/// Applies the fields present in `changes`; absent fields keep their value.
pub async fn update_task(
    pool: &SqlitePool,
    user_id: i64,
    task_id: i64,
    changes: TaskChanges,
) -> Result<Task, AppError> {
    let mut task = authorized_task(pool, user_id, task_id, TaskAction::Update).await?;
    changes.validate()?;

    if changes.is_empty() {
        return Ok(task);
    }

    if let Some(Some(title)) = changes.title {
        task.title = title;
    }
    if let Some(description) = changes.description {
        task.description = description.filter(|d| !d.trim().is_empty());
    }
    if let Some(due_date) = changes.due_date {
        task.due_date = due_date.as_deref().and_then(parse_due_date);
    }

    let updated = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET title = $1, description = $2, due_date = $3, updated_at = $4
         WHERE id = $5
         RETURNING id, user_id, title, description, due_date, completed, created_at, updated_at",
    )
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.due_date)
    .bind(Utc::now())
    .bind(task.id)
    .fetch_one(pool)
    .await?;

    log::debug!("user {} updated task {}", user_id, task_id);
    Ok(updated)
}

/// Permanently removes a task. Deleting it again yields NotFound.
pub async fn delete_task(pool: &SqlitePool, user_id: i64, task_id: i64) -> Result<(), AppError> {
    authorized_task(pool, user_id, task_id, TaskAction::Delete).await?;

    let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
        .bind(task_id)
        .execute(pool)
        .await?;

    // A concurrent delete may have won between the lookup and here.
    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Task not found".into()));
    }

    log::info!("user {} deleted task {}", user_id, task_id);
    Ok(())
}

/// Flips `completed`. The flip happens in SQL so two toggles never read the same value.
pub async fn toggle_complete(pool: &SqlitePool, user_id: i64, task_id: i64) -> Result<Task, AppError> {
    authorized_task(pool, user_id, task_id, TaskAction::Update).await?;

    let task = sqlx::query_as::<_, Task>(
        "UPDATE tasks SET completed = NOT completed, updated_at = $1
         WHERE id = $2
         RETURNING id, user_id, title, description, due_date, completed, created_at, updated_at",
    )
    .bind(Utc::now())
    .bind(task_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound("Task not found".into()))?;

    log::debug!("task {} completed = {}", task.id, task.completed);
    Ok(task)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::{pool, user};
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    async fn count_tasks(pool: &SqlitePool) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(pool)
            .await
            .unwrap();
        count
    }

    #[actix_rt::test]
    async fn test_create_defaults_and_owner() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;

        let task = create_task(&pool, alice.id, NewTask::titled("Buy milk"))
            .await
            .unwrap();

        assert_eq!(task.title, "Buy milk");
        assert_eq!(task.user_id, alice.id);
        assert!(!task.completed);
        assert_eq!(task.description, None);
        assert_eq!(task.due_date, None);
        assert_eq!(list_tasks(&pool, alice.id).await.unwrap(), vec![task]);
    }

    #[actix_rt::test]
    async fn test_invalid_input_persists_nothing() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;

        let err = create_task(&pool, alice.id, NewTask::titled("a".repeat(256)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        let err = create_task(&pool, alice.id, NewTask::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));

        assert_eq!(count_tasks(&pool).await, 0);
    }

    #[actix_rt::test]
    async fn test_list_is_scoped_and_newest_first() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        let bob = user(&pool, "Bob").await;

        let first = create_task(&pool, alice.id, NewTask::titled("first")).await.unwrap();
        let second = create_task(&pool, alice.id, NewTask::titled("second")).await.unwrap();
        create_task(&pool, bob.id, NewTask::titled("bob's")).await.unwrap();

        let ids: Vec<i64> = list_tasks(&pool, alice.id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);

        let bobs = list_tasks(&pool, bob.id).await.unwrap();
        assert_eq!(bobs.len(), 1);
        assert!(bobs.iter().all(|t| t.user_id == bob.id));
    }

    #[actix_rt::test]
    async fn test_other_users_are_forbidden_not_hidden() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        let bob = user(&pool, "Bob").await;
        let task = create_task(&pool, alice.id, NewTask::titled("private")).await.unwrap();

        assert!(matches!(
            get_task(&pool, bob.id, task.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            update_task(&pool, bob.id, task.id, TaskChanges::default().title("mine")).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            toggle_complete(&pool, bob.id, task.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            delete_task(&pool, bob.id, task.id).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            get_task(&pool, bob.id, task.id + 1000).await,
            Err(AppError::NotFound(_))
        ));

        assert_eq!(get_task(&pool, alice.id, task.id).await.unwrap(), task);
    }

    #[actix_rt::test]
    async fn test_update_leaves_absent_fields() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        let task = create_task(
            &pool,
            alice.id,
            NewTask {
                description: Some("two litres".into()),
                due_date: Some("2024-05-01".into()),
                ..NewTask::titled("Buy milk")
            },
        )
        .await
        .unwrap();

        let renamed = update_task(&pool, alice.id, task.id, TaskChanges::default().title("Buy oat milk"))
            .await
            .unwrap();
        assert_eq!(renamed.title, "Buy oat milk");
        assert_eq!(renamed.description.as_deref(), Some("two litres"));
        assert_eq!(renamed.due_date, NaiveDate::from_ymd_opt(2024, 5, 1));

        let cleared = update_task(
            &pool,
            alice.id,
            task.id,
            TaskChanges::default().description(None).due_date(None),
        )
        .await
        .unwrap();
        assert_eq!(cleared.title, "Buy oat milk");
        assert_eq!(cleared.description, None);
        assert_eq!(cleared.due_date, None);

        let err = update_task(&pool, alice.id, task.id, TaskChanges::default().title(""))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
        assert_eq!(
            get_task(&pool, alice.id, task.id).await.unwrap().title,
            "Buy oat milk"
        );
    }

    #[actix_rt::test]
    async fn test_toggle_is_its_own_inverse() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        let task = create_task(&pool, alice.id, NewTask::titled("toggle me")).await.unwrap();

        let once = toggle_complete(&pool, alice.id, task.id).await.unwrap();
        assert!(once.completed);
        let twice = toggle_complete(&pool, alice.id, task.id).await.unwrap();
        assert_eq!(twice.completed, task.completed);
    }

    #[actix_rt::test]
    async fn test_second_delete_is_not_found() {
        let pool = pool().await;
        let alice = user(&pool, "Alice").await;
        let task = create_task(&pool, alice.id, NewTask::titled("temporary")).await.unwrap();

        delete_task(&pool, alice.id, task.id).await.unwrap();
        assert!(matches!(
            delete_task(&pool, alice.id, task.id).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(count_tasks(&pool).await, 0);
    }
}
