//! Programme structure and memberships. Nothing here is touched by the sync.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};
use uuid::Uuid;

use crate::models::{Programme, ProgrammeMasterCourse, Stage, UserProgramme};

const PROGRAMME_MASTER_COURSE_SELECT: &str = r#"
    SELECT
        pmc.id AS id,
        pmc.programme_id AS programme_id,
        pmc.master_course_id AS master_course_id,
        m.vle_course_id AS master_vle_course_id,
        pmc.stage_id AS stage_id,
        pmc.available AS available,
        pmc.display_order AS display_order
    FROM programme_master_courses pmc
    JOIN master_courses m ON m.id = pmc.master_course_id
"#;

pub async fn insert_programme(
    conn: &mut SqliteConnection,
    display_name: &str,
) -> Result<Programme, sqlx::Error> {
    let programme = Programme {
        id: Uuid::new_v4().to_string(),
        display_name: display_name.to_string(),
    };

    sqlx::query("INSERT INTO programmes (id, display_name) VALUES (?, ?)")
        .bind(&programme.id)
        .bind(&programme.display_name)
        .execute(&mut *conn)
        .await?;

    Ok(programme)
}

pub async fn insert_stage(
    conn: &mut SqliteConnection,
    programme_id: &str,
    display_name: &str,
    stage_order: u32,
) -> Result<Stage, sqlx::Error> {
    let stage = Stage {
        id: Uuid::new_v4().to_string(),
        programme_id: programme_id.to_string(),
        display_name: display_name.to_string(),
        stage_order,
    };

    sqlx::query("INSERT INTO stages (id, programme_id, display_name, stage_order) VALUES (?, ?, ?, ?)")
        .bind(&stage.id)
        .bind(&stage.programme_id)
        .bind(&stage.display_name)
        .bind(stage.stage_order)
        .execute(&mut *conn)
        .await?;

    Ok(stage)
}

/// Offers a master course in a programme. The pair is unique in the schema.
pub async fn add_master_course(
    conn: &mut SqliteConnection,
    programme_id: &str,
    master_course_id: &str,
    stage_id: Option<&str>,
    display_order: u32,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO programme_master_courses (id, programme_id, master_course_id, stage_id, available, display_order) VALUES (?, ?, ?, ?, 1, ?)"
    )
    .bind(&id)
    .bind(programme_id)
    .bind(master_course_id)
    .bind(stage_id)
    .bind(display_order)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn add_user(
    conn: &mut SqliteConnection,
    username: &str,
    programme_id: &str,
) -> Result<String, sqlx::Error> {
    let id = Uuid::new_v4().to_string();

    sqlx::query("INSERT INTO user_programmes (id, username, programme_id) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(username)
        .bind(programme_id)
        .execute(&mut *conn)
        .await?;

    Ok(id)
}

/// Programmes a user belongs to, ordered by programme name.
pub async fn fetch_user_programmes(
    conn: &mut SqliteConnection,
    username: &str,
) -> Result<Vec<UserProgramme>, sqlx::Error> {
    sqlx::query_as::<_, UserProgramme>(
        r#"
        SELECT
            up.id AS id,
            up.username AS username,
            up.programme_id AS programme_id,
            p.display_name AS programme_display_name
        FROM user_programmes up
        JOIN programmes p ON p.id = up.programme_id
        WHERE up.username = ?
        ORDER BY p.display_name
        "#,
    )
    .bind(username)
    .fetch_all(&mut *conn)
    .await
}

pub async fn fetch_programme_master_courses(
    conn: &mut SqliteConnection,
    programme_ids: &[String],
) -> Result<Vec<ProgrammeMasterCourse>, sqlx::Error> {
    if programme_ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(PROGRAMME_MASTER_COURSE_SELECT);
    qb.push(" WHERE pmc.programme_id IN (");
    let mut separated = qb.separated(", ");
    for id in programme_ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(") ORDER BY pmc.display_order");

    qb.build_query_as::<ProgrammeMasterCourse>()
        .fetch_all(&mut *conn)
        .await
}

/// Courses currently offered in a stage, in display order.
pub async fn fetch_stage_courses(
    conn: &mut SqliteConnection,
    stage_id: &str,
) -> Result<Vec<ProgrammeMasterCourse>, sqlx::Error> {
    sqlx::query_as::<_, ProgrammeMasterCourse>(&format!(
        "{PROGRAMME_MASTER_COURSE_SELECT} WHERE pmc.stage_id = ? AND pmc.available = 1 ORDER BY pmc.display_order"
    ))
    .bind(stage_id)
    .fetch_all(&mut *conn)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{self, repository};

    #[tokio::test]
    async fn test_user_programmes_are_ordered_by_name() {
        let pool = db::connect_in_memory().await.expect("Failed to create test db");
        let mut conn = pool.acquire().await.expect("Failed to acquire");

        let maths = insert_programme(&mut conn, "Maths").await.expect("Failed to insert");
        let cats = insert_programme(&mut conn, "CATS").await.expect("Failed to insert");
        add_user(&mut conn, "student.1", &maths.id).await.expect("Failed to add user");
        add_user(&mut conn, "student.1", &cats.id).await.expect("Failed to add user");
        add_user(&mut conn, "student.2", &cats.id).await.expect("Failed to add user");

        let programmes = fetch_user_programmes(&mut conn, "student.1").await.expect("Failed to fetch");
        let names: Vec<_> = programmes.iter().map(|p| p.programme_display_name.as_str()).collect();
        assert_eq!(names, vec!["CATS", "Maths"]);
    }

    #[tokio::test]
    async fn test_duplicate_programme_master_course_is_rejected() {
        let pool = db::connect_in_memory().await.expect("Failed to create test db");
        let mut conn = pool.acquire().await.expect("Failed to acquire");

        let programme = insert_programme(&mut conn, "Global MBA").await.expect("Failed to insert");
        let (master, _) = repository::resolve_master_course(&mut conn, "it001", None)
            .await
            .expect("Failed to resolve");

        add_master_course(&mut conn, &programme.id, &master.id, None, 0)
            .await
            .expect("Failed to add course");
        let duplicate = add_master_course(&mut conn, &programme.id, &master.id, None, 1).await;
        assert!(duplicate.is_err());
    }

    #[tokio::test]
    async fn test_stage_courses_hide_unavailable() {
        let pool = db::connect_in_memory().await.expect("Failed to create test db");
        let mut conn = pool.acquire().await.expect("Failed to acquire");

        let programme = insert_programme(&mut conn, "Maths").await.expect("Failed to insert");
        let stage = insert_stage(&mut conn, &programme.id, "Year 1", 1).await.expect("Failed to insert");

        let mut links = Vec::new();
        for (order, vle_id) in ["maths002", "maths001"].iter().enumerate() {
            let (master, _) = repository::resolve_master_course(&mut conn, vle_id, None)
                .await
                .expect("Failed to resolve");
            let link = add_master_course(&mut conn, &programme.id, &master.id, Some(stage.id.as_str()), order as u32)
                .await
                .expect("Failed to add course");
            links.push(link);
        }

        let courses = fetch_stage_courses(&mut conn, &stage.id).await.expect("Failed to fetch");
        let ids: Vec<_> = courses.iter().map(|c| c.master_vle_course_id.as_str()).collect();
        assert_eq!(ids, vec!["maths002", "maths001"]);

        sqlx::query("UPDATE programme_master_courses SET available = 0 WHERE id = ?")
            .bind(&links[0])
            .execute(&mut *conn)
            .await
            .expect("Failed to update");
        let courses = fetch_stage_courses(&mut conn, &stage.id).await.expect("Failed to fetch");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].master_vle_course_id, "maths001");

        let all = fetch_programme_master_courses(&mut conn, &[programme.id.clone()])
            .await
            .expect("Failed to fetch");
        assert_eq!(all.len(), 2);
    }
}
