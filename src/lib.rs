pub mod app;
pub mod auth;
#[cfg(feature = "ssr")]
pub mod config;
pub mod error;
pub mod filter;
pub mod forms;
pub mod leaderboard;
pub mod model;
pub mod paging;
#[cfg(feature = "ssr")]
pub mod schema;
pub mod store;
pub mod submission;

#[cfg(feature = "ssr")]
use chrono::{Duration, NaiveDateTime, Utc};
#[cfg(feature = "ssr")]
use diesel::connection::SimpleConnection;
#[cfg(feature = "ssr")]
use diesel::prelude::*;
#[cfg(feature = "ssr")]
use diesel::r2d2::{ConnectionManager, CustomizeConnection, Pool};
#[cfg(feature = "ssr")]
use diesel::result::{DatabaseErrorKind, Error as DbError};
#[cfg(feature = "ssr")]
use diesel::SqliteConnection;
#[cfg(feature = "ssr")]
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
#[cfg(feature = "ssr")]
use std::collections::HashMap;
#[cfg(feature = "ssr")]
use std::io::{Error as IoError, ErrorKind};
#[cfg(feature = "ssr")]
use uuid::Uuid;

#[cfg(feature = "ssr")]
use crate::leaderboard::{rank_teams, TeamStanding};
#[cfg(feature = "ssr")]
use crate::model::{
    Challenge, LeaderboardEntry, NewChallenge, NewSession, NewSubmission, NewUser, SolveRecord,
    SubmissionLog, User, UserStats,
};
#[cfg(feature = "ssr")]
use crate::schema::{challenges, sessions, submissions, user_challenges, users};
#[cfg(feature = "ssr")]
use crate::store::{DbPool, SolveWrite};

/// How many submission events the activity log shows.
pub const SUBMISSION_LOG_LIMIT: i64 = 500;

#[cfg(feature = "ssr")]
pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[cfg(feature = "hydrate")]
#[wasm_bindgen::prelude::wasm_bindgen]
pub fn hydrate() {
    use crate::app::*;
    console_error_panic_hook::set_once();
    leptos::mount::hydrate_body(App);
}

/// Enables foreign keys, and WAL mode so reads can run during writes, with a timeout to retry
/// locked operations.
#[cfg(feature = "ssr")]
pub fn configure_connection(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        "PRAGMA foreign_keys = ON; \
        PRAGMA journal_mode = WAL; \
        PRAGMA synchronous = NORMAL; \
        PRAGMA busy_timeout = 10000;",
    )
}

#[cfg(feature = "ssr")]
#[derive(Debug, Clone, Copy)]
pub struct SqlitePragmas;

#[cfg(feature = "ssr")]
impl CustomizeConnection<SqliteConnection, diesel::r2d2::Error> for SqlitePragmas {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), diesel::r2d2::Error> {
        configure_connection(conn).map_err(diesel::r2d2::Error::QueryError)
    }
}

#[cfg(feature = "ssr")]
pub fn establish_connection(database_url: &str) -> ConnectionResult<SqliteConnection> {
    let mut conn = SqliteConnection::establish(database_url)?;
    configure_connection(&mut conn).map_err(ConnectionError::CouldntSetupConfiguration)?;
    Ok(conn)
}

#[cfg(feature = "ssr")]
pub fn build_pool(database_url: &str) -> Result<DbPool, diesel::r2d2::PoolError> {
    Pool::builder()
        .connection_customizer(Box::new(SqlitePragmas))
        .build(ConnectionManager::<SqliteConnection>::new(database_url))
}

#[cfg(feature = "ssr")]
pub fn run_migrations(
    conn: &mut SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    conn.run_pending_migrations(MIGRATIONS)?;
    Ok(())
}

#[cfg(feature = "ssr")]
pub fn is_unique_violation(err: &DbError) -> bool {
    matches!(err, DbError::DatabaseError(DatabaseErrorKind::UniqueViolation, _))
}

#[cfg(feature = "ssr")]
fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

/// Creates a session for a user and returns its token.
#[cfg(feature = "ssr")]
pub fn create_session(
    conn: &mut SqliteConnection,
    user_id: &str,
    max_age_secs: i64,
) -> Result<String, DbError> {
    let token = Uuid::new_v4().to_string();
    let created_at = now();
    let new_session = NewSession {
        user_id,
        token: &token,
        created_at,
        expires_at: created_at + Duration::seconds(max_age_secs),
    };
    diesel::insert_into(sessions::table)
        .values(&new_session)
        .execute(conn)?;
    Ok(token)
}

/// Creates an account and signs it in. Errors with a unique violation if the email is taken.
/// Returns the new user and their session token.
#[cfg(feature = "ssr")]
pub fn sign_up_user(
    conn: &mut SqliteConnection,
    team_name: &str,
    email: &str,
    password: &str,
    is_admin: bool,
    max_age_secs: i64,
) -> Result<(User, String), DbError> {
    let password_hash = auth::hash_password(password).map_err(|e| {
        DbError::QueryBuilderError(Box::new(IoError::new(ErrorKind::Other, e.to_string())))
    })?;

    conn.transaction(|conn| {
        let id = Uuid::new_v4().to_string();
        let new_user = NewUser {
            id: &id,
            email,
            password_hash: &password_hash,
            team_name,
            is_admin,
            created_at: now(),
        };
        diesel::insert_into(users::table)
            .values(&new_user)
            .execute(conn)?;

        let user: User = users::table
            .find(id.as_str())
            .select(User::as_select())
            .first(conn)?;
        let token = create_session(conn, &user.id, max_age_secs)?;
        Ok((user, token))
    })
}

/// Checks credentials and opens a new session. Returns None when the email is unknown or the
/// password is wrong.
#[cfg(feature = "ssr")]
pub fn sign_in_user(
    conn: &mut SqliteConnection,
    email: &str,
    password: &str,
    max_age_secs: i64,
) -> Result<Option<(User, String)>, DbError> {
    let user: Option<User> = users::table
        .filter(users::email.eq(email))
        .select(User::as_select())
        .first(conn)
        .optional()?;

    match user {
        Some(user) if auth::verify_password(password, &user.password_hash) => {
            let token = create_session(conn, &user.id, max_age_secs)?;
            Ok(Some((user, token)))
        }
        _ => Ok(None),
    }
}

/// Retrieves the user behind an unexpired session token.
#[cfg(feature = "ssr")]
pub fn get_user_by_token(conn: &mut SqliteConnection, token: &str) -> Result<User, DbError> {
    if Uuid::parse_str(token).is_err() {
        return Err(DbError::NotFound);
    }

    let user: Option<User> = sessions::table
        .inner_join(users::table)
        .filter(sessions::token.eq(token))
        .filter(sessions::expires_at.gt(now()))
        .select(User::as_select())
        .first(conn)
        .optional()?;
    user.ok_or(DbError::NotFound)
}

/// Ends a session. Returns the number of sessions removed.
#[cfg(feature = "ssr")]
pub fn sign_out_token(conn: &mut SqliteConnection, token: &str) -> Result<usize, DbError> {
    diesel::delete(sessions::table.filter(sessions::token.eq(token))).execute(conn)
}

#[cfg(feature = "ssr")]
pub fn delete_expired_sessions(conn: &mut SqliteConnection) -> Result<usize, DbError> {
    diesel::delete(sessions::table.filter(sessions::expires_at.le(now()))).execute(conn)
}

#[cfg(feature = "ssr")]
pub fn update_team_name(
    conn: &mut SqliteConnection,
    user_id: &str,
    team_name: &str,
) -> Result<User, DbError> {
    diesel::update(users::table.find(user_id))
        .set(users::team_name.eq(team_name))
        .execute(conn)?;
    users::table
        .find(user_id)
        .select(User::as_select())
        .first(conn)
}

/// Grants or revokes admin rights by email. Returns the number of affected rows.
#[cfg(feature = "ssr")]
pub fn set_admin(
    conn: &mut SqliteConnection,
    email: &str,
    is_admin: bool,
) -> Result<usize, DbError> {
    diesel::update(users::table.filter(users::email.eq(email.trim().to_lowercase())))
        .set(users::is_admin.eq(is_admin))
        .execute(conn)
}

/// The user's score as stored on their row, and their solve count as counted from the solve
/// records.
#[cfg(feature = "ssr")]
pub fn get_user_stats(conn: &mut SqliteConnection, user_id: &str) -> Result<UserStats, DbError> {
    let score: i64 = users::table
        .find(user_id)
        .select(users::score)
        .first(conn)?;

    let solved_count: i64 = user_challenges::table
        .filter(user_challenges::user_id.eq(user_id))
        .filter(user_challenges::solved.eq(true))
        .count()
        .get_result(conn)?;
    let solved_ids: Vec<String> = user_challenges::table
        .filter(user_challenges::user_id.eq(user_id))
        .filter(user_challenges::solved.eq(true))
        .select(user_challenges::challenge_id)
        .load(conn)?;

    let total_challenges: i64 = challenges::table.count().get_result(conn)?;

    Ok(UserStats {
        score,
        solved_count,
        total_challenges,
        solved_ids,
    })
}

/// Fetches all challenges, newest first.
#[cfg(feature = "ssr")]
pub fn get_all_challenges(conn: &mut SqliteConnection) -> Result<Vec<Challenge>, DbError> {
    challenges::table
        .order((challenges::created_at.desc(), challenges::id.desc()))
        .select(Challenge::as_select())
        .load(conn)
}

#[cfg(feature = "ssr")]
pub fn get_challenge(
    conn: &mut SqliteConnection,
    challenge_id: &str,
) -> Result<Option<Challenge>, DbError> {
    challenges::table
        .find(challenge_id)
        .select(Challenge::as_select())
        .first(conn)
        .optional()
}

#[cfg(feature = "ssr")]
pub fn create_challenge(
    conn: &mut SqliteConnection,
    new_challenge: &NewChallenge,
) -> Result<Challenge, DbError> {
    let challenge = Challenge {
        id: Uuid::new_v4().to_string(),
        title: new_challenge.title.clone(),
        category: new_challenge.category.as_str().to_string(),
        points: new_challenge.points,
        description: new_challenge.description.clone(),
        resource_link: new_challenge.resource_link.clone(),
        flag: new_challenge.flag.clone(),
        created_at: now(),
    };
    diesel::insert_into(challenges::table)
        .values(&challenge)
        .execute(conn)?;
    Ok(challenge)
}

/// Deletes a challenge along with its solve records and submission log. Scores already awarded
/// are left as they are. Returns the number of challenges deleted.
#[cfg(feature = "ssr")]
pub fn delete_challenge(conn: &mut SqliteConnection, challenge_id: &str) -> Result<usize, DbError> {
    conn.transaction(|conn| {
        diesel::delete(
            user_challenges::table.filter(user_challenges::challenge_id.eq(challenge_id)),
        )
        .execute(conn)?;
        diesel::delete(submissions::table.filter(submissions::challenge_id.eq(challenge_id)))
            .execute(conn)?;
        diesel::delete(challenges::table.find(challenge_id)).execute(conn)
    })
}

#[cfg(feature = "ssr")]
pub fn find_solve(
    conn: &mut SqliteConnection,
    user_id: &str,
    challenge_id: &str,
) -> Result<Option<SolveRecord>, DbError> {
    user_challenges::table
        .find((user_id, challenge_id))
        .select(SolveRecord::as_select())
        .first(conn)
        .optional()
}

/// Writes a solve record and adds its points to the user's score, inside one IMMEDIATE
/// transaction so concurrent writers for the same pair serialize. If the pair is already solved,
/// nothing changes and `Conflict` is returned.
#[cfg(feature = "ssr")]
pub fn record_solve(
    conn: &mut SqliteConnection,
    solve: &SolveRecord,
) -> Result<SolveWrite, DbError> {
    let key = (solve.user_id.as_str(), solve.challenge_id.as_str());
    conn.immediate_transaction(|conn| {
        let existing: Option<SolveRecord> = user_challenges::table
            .find(key)
            .select(SolveRecord::as_select())
            .first(conn)
            .optional()?;

        match existing {
            Some(record) if record.solved => return Ok(SolveWrite::Conflict),
            Some(_) => {
                diesel::update(user_challenges::table.find(key))
                    .set((
                        user_challenges::solved.eq(true),
                        user_challenges::points.eq(solve.points),
                        user_challenges::solved_at.eq(solve.solved_at),
                    ))
                    .execute(conn)?;
            }
            None => {
                let inserted = diesel::insert_into(user_challenges::table)
                    .values(solve)
                    .execute(conn);
                match inserted {
                    Err(e) if is_unique_violation(&e) => return Ok(SolveWrite::Conflict),
                    other => {
                        other?;
                    }
                }
            }
        }

        diesel::update(users::table.find(solve.user_id.as_str()))
            .set(users::score.eq(users::score + i64::from(solve.points)))
            .execute(conn)?;

        Ok(SolveWrite::Recorded)
    })
}

/// Appends an attempt to the activity log.
#[cfg(feature = "ssr")]
pub fn log_submission(
    conn: &mut SqliteConnection,
    user_id: &str,
    challenge_id: &str,
    is_correct: bool,
    submitted_at: NaiveDateTime,
) -> Result<(), DbError> {
    let submission = NewSubmission {
        user_id,
        challenge_id,
        is_correct,
        submitted_at,
    };
    diesel::insert_into(submissions::table)
        .values(&submission)
        .execute(conn)?;
    Ok(())
}

/// Returns the latest `limit` submissions with team and challenge names, newest first.
#[cfg(feature = "ssr")]
pub fn get_submission_logs(
    conn: &mut SqliteConnection,
    limit: i64,
) -> Result<Vec<SubmissionLog>, DbError> {
    submissions::table
        .inner_join(users::table)
        .inner_join(challenges::table)
        .select((
            submissions::id,
            users::team_name,
            challenges::title,
            challenges::category,
            submissions::is_correct,
            submissions::submitted_at,
        ))
        .order((submissions::submitted_at.desc(), submissions::id.desc()))
        .limit(limit)
        .load(conn)
}

/// Ranks every non-admin team.
#[cfg(feature = "ssr")]
pub fn get_leaderboard(conn: &mut SqliteConnection) -> Result<Vec<LeaderboardEntry>, DbError> {
    let teams: Vec<(String, String, i64)> = users::table
        .filter(users::is_admin.eq(false))
        .select((users::id, users::team_name, users::score))
        .load(conn)?;

    let solves: Vec<(String, NaiveDateTime)> = user_challenges::table
        .filter(user_challenges::solved.eq(true))
        .select((user_challenges::user_id, user_challenges::solved_at))
        .load(conn)?;

    let mut solve_totals: HashMap<String, (i64, NaiveDateTime)> = HashMap::new();
    for (user_id, solved_at) in solves {
        let entry = solve_totals.entry(user_id).or_insert((0, solved_at));
        entry.0 += 1;
        entry.1 = entry.1.max(solved_at);
    }

    let total_challenges: i64 = challenges::table.count().get_result(conn)?;

    let standings = teams
        .into_iter()
        .map(|(user_id, team_name, score)| {
            let totals = solve_totals.get(&user_id).copied();
            TeamStanding {
                team_name,
                score,
                solved_count: totals.map_or(0, |(count, _)| count),
                last_solve_at: totals.map(|(_, last)| last),
                user_id,
            }
        })
        .collect();

    Ok(rank_teams(standings, total_challenges))
}

/// Clears the competition: challenges, solves, submissions, and sessions are deleted and every
/// score goes back to zero. Accounts are kept.
#[cfg(feature = "ssr")]
pub fn reset_database(conn: &mut SqliteConnection) -> Result<(), DbError> {
    conn.transaction(|conn| {
        diesel::delete(submissions::table).execute(conn)?;
        diesel::delete(user_challenges::table).execute(conn)?;
        diesel::delete(challenges::table).execute(conn)?;
        diesel::delete(sessions::table).execute(conn)?;
        diesel::update(users::table)
            .set(users::score.eq(0i64))
            .execute(conn)?;
        Ok(())
    })
}

#[cfg(all(test, feature = "ssr"))]
mod tests {
    use super::*;
    use crate::model::{Category, SessionUser};
    use crate::store::{DbStore, SolveStore};
    use crate::submission::{submit_flag, SubmitOutcome};

    // Every test gets its own in-memory database with the schema applied.
    fn test_connection() -> SqliteConnection {
        let mut conn = establish_connection(":memory:").expect("Failed to open database");
        run_migrations(&mut conn).expect("Failed to run migrations");
        conn
    }

    // Inserts a user directly, skipping password hashing.
    fn insert_user(conn: &mut SqliteConnection, team_name: &str, is_admin: bool) -> User {
        let id = Uuid::new_v4().to_string();
        let email = format!("{}@example.com", team_name.to_lowercase().replace(' ', "."));
        diesel::insert_into(users::table)
            .values(&NewUser {
                id: &id,
                email: &email,
                password_hash: "x",
                team_name,
                is_admin,
                created_at: now(),
            })
            .execute(conn)
            .expect("Failed to insert user");
        users::table
            .find(id.as_str())
            .select(User::as_select())
            .first(conn)
            .expect("Failed to fetch user")
    }

    fn new_challenge(title: &str, category: Category, points: i32, flag: &str) -> NewChallenge {
        NewChallenge {
            title: title.to_string(),
            category,
            points,
            description: format!("{} description", title),
            resource_link: None,
            flag: flag.to_string(),
        }
    }

    fn solve_of(user: &User, challenge: &Challenge, minute: i64) -> SolveRecord {
        SolveRecord {
            user_id: user.id.clone(),
            challenge_id: challenge.id.clone(),
            solved: true,
            points: challenge.points,
            solved_at: chrono::DateTime::from_timestamp(1_760_000_000 + minute * 60, 0)
                .unwrap()
                .naive_utc(),
        }
    }

    #[test]
    fn test_migrations_create_empty_tables() {
        let mut conn = test_connection();
        let count: i64 = users::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
        let count: i64 = challenges::table.count().get_result(&mut conn).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_sign_up_sign_in_sign_out() {
        let mut conn = test_connection();

        let (user, token) =
            sign_up_user(&mut conn, "Null Pointers", "np@example.com", "hunter22", false, 3600)
                .expect("Failed to sign up");
        assert_eq!(user.team_name, "Null Pointers");
        assert_eq!(user.score, 0);
        assert!(!user.is_admin);
        assert_ne!(user.password_hash, "hunter22");
        assert!(Uuid::parse_str(&token).is_ok());

        // The sign-up session resolves to the user.
        let resolved = get_user_by_token(&mut conn, &token).unwrap();
        assert_eq!(resolved.id, user.id);

        // Same email again.
        let err = sign_up_user(&mut conn, "Copycats", "np@example.com", "hunter22", false, 3600)
            .expect_err("Duplicate email should fail");
        assert!(is_unique_violation(&err));

        // Wrong password and unknown email.
        assert!(sign_in_user(&mut conn, "np@example.com", "hunter23", 3600)
            .unwrap()
            .is_none());
        assert!(sign_in_user(&mut conn, "nobody@example.com", "hunter22", 3600)
            .unwrap()
            .is_none());

        // A second session alongside the first.
        let (signed_in, second_token) = sign_in_user(&mut conn, "np@example.com", "hunter22", 3600)
            .unwrap()
            .expect("Sign in should succeed");
        assert_eq!(signed_in.id, user.id);
        assert_ne!(second_token, token);

        assert_eq!(sign_out_token(&mut conn, &token).unwrap(), 1);
        assert!(matches!(
            get_user_by_token(&mut conn, &token),
            Err(DbError::NotFound)
        ));
        assert!(get_user_by_token(&mut conn, &second_token).is_ok());
    }

    #[test]
    fn test_token_validation_and_expiry() {
        let mut conn = test_connection();
        let user = insert_user(&mut conn, "Timeouts", false);

        assert!(get_user_by_token(&mut conn, "not-a-uuid").is_err());
        assert!(get_user_by_token(&mut conn, &Uuid::new_v4().to_string()).is_err());

        let expired = create_session(&mut conn, &user.id, -60).unwrap();
        assert!(matches!(
            get_user_by_token(&mut conn, &expired),
            Err(DbError::NotFound)
        ));

        let live = create_session(&mut conn, &user.id, 60).unwrap();
        assert_eq!(delete_expired_sessions(&mut conn).unwrap(), 1);
        assert_eq!(get_user_by_token(&mut conn, &live).unwrap().id, user.id);
    }

    #[test]
    fn test_update_team_name_and_set_admin() {
        let mut conn = test_connection();
        let user = insert_user(&mut conn, "Old Name", false);

        let renamed = update_team_name(&mut conn, &user.id, "New Name").unwrap();
        assert_eq!(renamed.team_name, "New Name");
        assert_eq!(renamed.id, user.id);

        assert_eq!(set_admin(&mut conn, " OLD.NAME@example.com", true).unwrap(), 1);
        let user: User = users::table
            .find(user.id.as_str())
            .select(User::as_select())
            .first(&mut conn)
            .unwrap();
        assert!(user.is_admin);
        assert_eq!(set_admin(&mut conn, "nobody@example.com", true).unwrap(), 0);
    }

    #[test]
    fn test_challenges_newest_first_and_delete() {
        let mut conn = test_connection();
        let first = create_challenge(
            &mut conn,
            &new_challenge("First", Category::Web, 100, "ROOT{1}"),
        )
        .unwrap();
        diesel::update(challenges::table.find(first.id.as_str()))
            .set(challenges::created_at.eq(first.created_at - Duration::minutes(5)))
            .execute(&mut conn)
            .unwrap();
        let second = create_challenge(
            &mut conn,
            &new_challenge("Second", Category::Pwn, 200, "ROOT{2}"),
        )
        .unwrap();

        let all = get_all_challenges(&mut conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, second.id);
        assert_eq!(all[0].category, "PWN");
        assert_eq!(all[1].id, first.id);

        let fetched = get_challenge(&mut conn, &first.id).unwrap().unwrap();
        assert_eq!(fetched.title, "First");
        assert_eq!(fetched.flag, "ROOT{1}");
        assert_eq!(fetched.points, 100);
        assert!(get_challenge(&mut conn, "missing").unwrap().is_none());

        // Deleting removes solves and log rows too, but keeps the awarded score.
        let user = insert_user(&mut conn, "Solvers", false);
        record_solve(&mut conn, &solve_of(&user, &first, 1)).unwrap();
        log_submission(&mut conn, &user.id, &first.id, true, now()).unwrap();

        assert_eq!(delete_challenge(&mut conn, &first.id).unwrap(), 1);
        assert!(find_solve(&mut conn, &user.id, &first.id).unwrap().is_none());
        assert!(get_submission_logs(&mut conn, SUBMISSION_LOG_LIMIT)
            .unwrap()
            .is_empty());
        let stats = get_user_stats(&mut conn, &user.id).unwrap();
        assert_eq!(stats.score, 100);
        assert_eq!(stats.solved_count, 0);
        assert_eq!(stats.total_challenges, 1);

        assert_eq!(delete_challenge(&mut conn, &first.id).unwrap(), 0);
    }

    #[test]
    fn test_negative_points_rejected_by_store() {
        let mut conn = test_connection();
        let result = create_challenge(
            &mut conn,
            &new_challenge("Broken", Category::Misc, -5, "ROOT{x}"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_record_solve_once() {
        let mut conn = test_connection();
        let user = insert_user(&mut conn, "Once", false);
        let challenge = create_challenge(
            &mut conn,
            &new_challenge("Solve Me", Category::Forensics, 150, "ROOT{once}"),
        )
        .unwrap();

        let solve = solve_of(&user, &challenge, 3);
        assert_eq!(record_solve(&mut conn, &solve).unwrap(), SolveWrite::Recorded);
        assert_eq!(record_solve(&mut conn, &solve).unwrap(), SolveWrite::Conflict);

        let stored = find_solve(&mut conn, &user.id, &challenge.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored, solve);

        let stats = get_user_stats(&mut conn, &user.id).unwrap();
        assert_eq!(stats.score, 150);
        assert_eq!(stats.solved_count, 1);
        assert_eq!(stats.solved_ids, vec![challenge.id.clone()]);
    }

    #[test]
    fn test_record_solve_upgrades_unsolved_row() {
        let mut conn = test_connection();
        let user = insert_user(&mut conn, "Late", false);
        let challenge = create_challenge(
            &mut conn,
            &new_challenge("Pending", Category::Reverse, 75, "ROOT{late}"),
        )
        .unwrap();

        let mut pending = solve_of(&user, &challenge, 0);
        pending.solved = false;
        diesel::insert_into(user_challenges::table)
            .values(&pending)
            .execute(&mut conn)
            .unwrap();
        assert_eq!(get_user_stats(&mut conn, &user.id).unwrap().solved_count, 0);

        let solve = solve_of(&user, &challenge, 9);
        assert_eq!(record_solve(&mut conn, &solve).unwrap(), SolveWrite::Recorded);
        let stats = get_user_stats(&mut conn, &user.id).unwrap();
        assert_eq!(stats.solved_count, 1);
        assert_eq!(stats.score, 75);
    }

    #[test]
    fn test_scores_past_i32_range_stay_exact() {
        let mut conn = test_connection();
        let big = insert_user(&mut conn, "Big", false);
        let small = insert_user(&mut conn, "Small", false);

        let first = create_challenge(
            &mut conn,
            &new_challenge("Huge One", Category::Misc, 2_000_000_000, "ROOT{one}"),
        )
        .unwrap();
        let second = create_challenge(
            &mut conn,
            &new_challenge("Huge Two", Category::Misc, 2_000_000_000, "ROOT{two}"),
        )
        .unwrap();
        let tiny = create_challenge(
            &mut conn,
            &new_challenge("Tiny", Category::Misc, 10, "ROOT{tiny}"),
        )
        .unwrap();

        record_solve(&mut conn, &solve_of(&big, &first, 1)).unwrap();
        record_solve(&mut conn, &solve_of(&big, &second, 2)).unwrap();
        record_solve(&mut conn, &solve_of(&small, &tiny, 3)).unwrap();

        let stats = get_user_stats(&mut conn, &big.id).unwrap();
        assert_eq!(stats.score, 4_000_000_000);

        let board = get_leaderboard(&mut conn).unwrap();
        assert_eq!(board[0].team_name, "Big");
        assert_eq!(board[0].score, 4_000_000_000);
        assert_eq!(board[1].score, 10);
    }

    #[test]
    fn test_submit_through_db_store() {
        let pool = Pool::builder()
            .max_size(1)
            .connection_customizer(Box::new(SqlitePragmas))
            .build(ConnectionManager::<SqliteConnection>::new(":memory:"))
            .expect("Failed to build pool");
        let store = DbStore::new(pool);

        let (user, challenge) = {
            let mut conn = store.conn().unwrap();
            run_migrations(&mut conn).unwrap();
            let user = insert_user(&mut conn, "Pooled", false);
            let challenge = create_challenge(
                &mut conn,
                &new_challenge("Pool Party", Category::Misc, 50, "ROOT{pool}"),
            )
            .unwrap();
            (user, challenge)
        };
        let session_user = SessionUser::from(&user);

        assert!(store.challenge(&challenge.id).unwrap().is_some());

        let wrong = submit_flag(&store, Some(&session_user), &challenge.id, "ROOT{POOL}", now());
        assert_eq!(wrong, Err(crate::error::CtfError::IncorrectFlag));
        assert!(store
            .find_solve(&user.id, &challenge.id)
            .unwrap()
            .is_none());

        let first = submit_flag(&store, Some(&session_user), &challenge.id, "ROOT{pool}", now());
        let second = submit_flag(&store, Some(&session_user), &challenge.id, "ROOT{pool}", now());
        assert_eq!(first, Ok(SubmitOutcome::Solved { points_awarded: 50 }));
        assert_eq!(second, Ok(SubmitOutcome::AlreadySolved));

        let mut conn = store.conn().unwrap();
        assert_eq!(get_user_stats(&mut conn, &user.id).unwrap().score, 50);
    }

    #[test]
    fn test_submission_logs_newest_first_with_limit() {
        let mut conn = test_connection();
        let alpha = insert_user(&mut conn, "Alpha", false);
        let bravo = insert_user(&mut conn, "Bravo", false);
        let web = create_challenge(
            &mut conn,
            &new_challenge("Cookie Jar", Category::Web, 100, "ROOT{c}"),
        )
        .unwrap();

        let base = now();
        log_submission(&mut conn, &alpha.id, &web.id, false, base).unwrap();
        log_submission(&mut conn, &bravo.id, &web.id, true, base + Duration::seconds(5)).unwrap();
        log_submission(&mut conn, &alpha.id, &web.id, true, base + Duration::seconds(10))
            .unwrap();

        let logs = get_submission_logs(&mut conn, SUBMISSION_LOG_LIMIT).unwrap();
        let summary: Vec<(&str, bool)> = logs
            .iter()
            .map(|l| (l.team_name.as_str(), l.is_correct))
            .collect();
        assert_eq!(
            summary,
            vec![("Alpha", true), ("Bravo", true), ("Alpha", false)]
        );
        assert_eq!(logs[0].challenge_title, "Cookie Jar");
        assert_eq!(logs[0].challenge_category, "WEB");

        assert_eq!(get_submission_logs(&mut conn, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_leaderboard_ranks_non_admins() {
        let mut conn = test_connection();
        let alpha = insert_user(&mut conn, "Alpha", false);
        let bravo = insert_user(&mut conn, "Bravo", false);
        let _charlie = insert_user(&mut conn, "Charlie", false);
        let admin = insert_user(&mut conn, "Organizers", true);

        let easy = create_challenge(
            &mut conn,
            &new_challenge("Easy", Category::Misc, 100, "ROOT{e}"),
        )
        .unwrap();
        let hard = create_challenge(
            &mut conn,
            &new_challenge("Hard", Category::Pwn, 400, "ROOT{h}"),
        )
        .unwrap();

        // Alpha and Bravo both reach 100; Bravo got there first.
        record_solve(&mut conn, &solve_of(&alpha, &easy, 20)).unwrap();
        record_solve(&mut conn, &solve_of(&bravo, &easy, 10)).unwrap();
        record_solve(&mut conn, &solve_of(&admin, &hard, 1)).unwrap();

        let board = get_leaderboard(&mut conn).unwrap();
        let order: Vec<(usize, &str, i64, i64)> = board
            .iter()
            .map(|e| (e.rank, e.team_name.as_str(), e.score, e.solved_count))
            .collect();
        assert_eq!(
            order,
            vec![
                (1, "Bravo", 100, 1),
                (2, "Alpha", 100, 1),
                (3, "Charlie", 0, 0)
            ]
        );
        assert!(board.iter().all(|e| e.total_challenges == 2));

        record_solve(&mut conn, &solve_of(&alpha, &hard, 30)).unwrap();
        let board = get_leaderboard(&mut conn).unwrap();
        assert_eq!(board[0].team_name, "Alpha");
        assert_eq!(board[0].score, 500);
        assert_eq!(board[0].solved_count, 2);
    }

    #[test]
    fn test_reset_database() {
        let mut conn = test_connection();
        let user = insert_user(&mut conn, "Resettable", false);
        let challenge = create_challenge(
            &mut conn,
            &new_challenge("Gone", Category::Web, 10, "ROOT{gone}"),
        )
        .unwrap();
        record_solve(&mut conn, &solve_of(&user, &challenge, 0)).unwrap();
        log_submission(&mut conn, &user.id, &challenge.id, true, now()).unwrap();
        let token = create_session(&mut conn, &user.id, 600).unwrap();

        reset_database(&mut conn).unwrap();

        assert!(get_all_challenges(&mut conn).unwrap().is_empty());
        assert!(get_user_by_token(&mut conn, &token).is_err());
        let stats = get_user_stats(&mut conn, &user.id).unwrap();
        assert_eq!(stats.score, 0);
        assert_eq!(stats.solved_count, 0);
        let users_left: i64 = users::table.count().get_result(&mut conn).unwrap();
        assert_eq!(users_left, 1);
    }
}
