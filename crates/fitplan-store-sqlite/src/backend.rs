//! [`SqliteBackend`], the SQLite implementation of [`Backend`].

use std::{path::Path, sync::Arc};

use chrono::Utc;
use rusqlite::{OptionalExtension as _, types::Value};
use tokio::sync::{broadcast, watch};
use tracing::debug;
use uuid::Uuid;

use fitplan_core::{
  auth::{AuthEvent, Credentials, Identity, Session, UserAttributes},
  link::{LinkKind, LinkOutcome},
  row::{
    DayRow, ExerciseRow, LinkRow, NewDayRow, NewExerciseRow, NewPlanRow,
    NewProfileRow, NewWeightRecordRow, PlanPatch, PlanRow, ProfilePatch,
    ProfileRow, WeightRecordRow,
  },
  store::{Backend, PlanOrder, PlanQuery},
};

use crate::{
  Error, Result,
  encode::{
    RawDay, RawExercise, RawLink, RawPlan, RawProfile, RawTree, RawWeightRecord,
    decode_dt, decode_uuid, encode_dt, encode_uuid, now,
  },
  schema::SCHEMA,
  secret::{hash_password, new_token, verify_password},
};

/// `client_kv` key under which the signed-in session token is persisted.
const SESSION_KEY: &str = "session_token";

const AUTH_EVENT_CAPACITY: usize = 16;

// ─── Backend ─────────────────────────────────────────────────────────────────

/// A fitplan backend stored in a single SQLite file.
///
/// The handle plays two roles: the hosted service (auth tables, relational
/// data) and the client that talks to it (the current session). Cloning is
/// cheap and clones share both the connection and the session.
/// [`SqliteBackend::fork_session`] yields a handle onto the same data with an
/// independent session, i.e. a second device.
#[derive(Clone)]
pub struct SqliteBackend {
  conn:            tokio_rusqlite::Connection,
  session:         Arc<watch::Sender<Option<Session>>>,
  events:          broadcast::Sender<AuthEvent>,
  persist_session: bool,
}

impl SqliteBackend {
  /// Open (or create) a database at `path`, run schema initialisation, and
  /// restore a previously persisted session if it is still valid.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let backend = Self::with_connection(conn, true);
    backend.init_schema().await?;
    backend.restore_session().await?;
    Ok(backend)
  }

  /// Open an in-memory database.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let backend = Self::with_connection(conn, true);
    backend.init_schema().await?;
    Ok(backend)
  }

  /// A handle onto the same database with its own, initially signed-out,
  /// session. The forked session is never persisted.
  pub fn fork_session(&self) -> Self {
    Self::with_connection(self.conn.clone(), false)
  }

  fn with_connection(conn: tokio_rusqlite::Connection, persist_session: bool) -> Self {
    let (events, _) = broadcast::channel(AUTH_EVENT_CAPACITY);
    Self {
      conn,
      session: Arc::new(watch::channel(None).0),
      events,
      persist_session,
    }
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Session bookkeeping ───────────────────────────────────────────────

  async fn restore_session(&self) -> Result<()> {
    let found: Option<(String, String, String, String)> = self
      .conn
      .call(|conn| {
        let row = conn
          .query_row(
            "SELECT s.token, u.user_id, u.email, s.created_at
               FROM client_kv kv
               JOIN sessions s ON s.token = kv.value
               JOIN users u ON u.user_id = s.user_id
              WHERE kv.key = ?1",
            rusqlite::params![SESSION_KEY],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
          )
          .optional()?;

        // Drop a token whose server-side session no longer exists.
        if row.is_none() {
          conn.execute(
            "DELETE FROM client_kv WHERE key = ?1",
            rusqlite::params![SESSION_KEY],
          )?;
        }
        Ok(row)
      })
      .await?;

    if let Some((token, user_id, email, created_at)) = found {
      let session = Session {
        access_token: token,
        user:         Identity { user_id: decode_uuid(&user_id)?, email },
        created_at:   decode_dt(&created_at)?,
      };
      debug!(user_id = %session.user.user_id, "restored persisted session");
      self.session.send_replace(Some(session));
    }
    Ok(())
  }

  async fn store_token(&self, token: Option<String>) -> Result<()> {
    if !self.persist_session {
      return Ok(());
    }
    self
      .conn
      .call(move |conn| {
        match token {
          Some(token) => conn.execute(
            "INSERT INTO client_kv (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            rusqlite::params![SESSION_KEY, token],
          )?,
          None => conn.execute(
            "DELETE FROM client_kv WHERE key = ?1",
            rusqlite::params![SESSION_KEY],
          )?,
        };
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Install `session` as current, persist it, and notify subscribers.
  async fn establish(&self, session: Session, event: AuthEvent) -> Result<Session> {
    self.session.send_replace(Some(session.clone()));
    self.store_token(Some(session.access_token.clone())).await?;
    // No subscribers is not an error.
    let _ = self.events.send(event);
    Ok(session)
  }

  /// Insert a session row for `user` and make it current.
  async fn start_session(&self, user: Identity) -> Result<Session> {
    let token = new_token();
    let at = Utc::now();
    let token_str = token.clone();
    let user_id_str = encode_uuid(user.user_id);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token, user_id, created_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![token_str, user_id_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    let session = Session { access_token: token, user, created_at: at };
    debug!(user_id = %session.user.user_id, "session started");
    self.establish(session.clone(), AuthEvent::SignedIn(session)).await
  }

  fn require_session(&self) -> Result<Session> {
    self.session.borrow().clone().ok_or(Error::NotSignedIn)
  }

  // ── Plan helpers ──────────────────────────────────────────────────────

  async fn fetch_plan_row(&self, plan_id: Uuid) -> Result<Option<PlanRow>> {
    let id_str = encode_uuid(plan_id);
    let raw: Option<RawPlan> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {} FROM workouts w
                   LEFT JOIN profiles p ON p.profile_id = w.owner_id
                  WHERE w.workout_id = ?1",
                RawPlan::COLUMNS
              ),
              rusqlite::params![id_str],
              RawPlan::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawPlan::into_row).transpose()
  }
}

fn link_table(kind: LinkKind) -> &'static str {
  match kind {
    LinkKind::Saved => "saved_workouts",
    LinkKind::Liked => "workout_likes",
  }
}

fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

// ─── Backend impl ────────────────────────────────────────────────────────────

impl Backend for SqliteBackend {
  type Error = Error;

  // ── Auth ──────────────────────────────────────────────────────────────

  async fn sign_up(&self, credentials: Credentials) -> Result<Session> {
    let email = credentials.email.trim().to_owned();
    let hash = hash_password(&credentials.password)?;
    let user_id = Uuid::new_v4();
    let user_id_str = encode_uuid(user_id);
    let email_str = email.clone();
    let at = now();

    let created: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM users WHERE email = ?1",
            rusqlite::params![email_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(false);
        }
        tx.execute(
          "INSERT INTO users (user_id, email, password_hash, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?4)",
          rusqlite::params![user_id_str, email_str, hash, at],
        )?;
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !created {
      return Err(Error::EmailTaken(email));
    }
    self.start_session(Identity { user_id, email }).await
  }

  async fn sign_in(&self, credentials: Credentials) -> Result<Session> {
    let email_str = credentials.email.trim().to_owned();

    let found: Option<(String, String, String)> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, email, password_hash FROM users WHERE email = ?1",
              rusqlite::params![email_str],
              |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .optional()?,
        )
      })
      .await?;

    let Some((user_id, email, phc)) = found else {
      return Err(Error::InvalidCredentials);
    };
    if !verify_password(&credentials.password, &phc) {
      return Err(Error::InvalidCredentials);
    }
    self
      .start_session(Identity { user_id: decode_uuid(&user_id)?, email })
      .await
  }

  async fn sign_out(&self) -> Result<()> {
    let Some(current) = self.session.borrow().clone() else {
      return Ok(());
    };

    // Local state is cleared even if revoking the token fails.
    self.session.send_replace(None);
    let _ = self.events.send(AuthEvent::SignedOut);

    let token = current.access_token;
    let revoked = self
      .conn
      .call(move |conn| {
        conn.execute(
          "DELETE FROM sessions WHERE token = ?1",
          rusqlite::params![token],
        )?;
        Ok(())
      })
      .await;
    self.store_token(None).await?;
    revoked?;
    debug!(user_id = %current.user.user_id, "signed out");
    Ok(())
  }

  fn current_session(&self) -> Option<Session> { self.session.borrow().clone() }

  async fn update_user(&self, attributes: UserAttributes) -> Result<Identity> {
    let mut session = self.require_session()?;
    let user_id_str = encode_uuid(session.user.user_id);
    let new_email = attributes.email.map(|e| e.trim().to_owned());
    let new_hash = attributes.password.as_deref().map(hash_password).transpose()?;
    let at = now();

    let email_str = new_email.clone();
    let updated: Option<String> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(email) = &email_str {
          let taken: bool = tx
            .query_row(
              "SELECT 1 FROM users WHERE email = ?1 AND user_id <> ?2",
              rusqlite::params![email, user_id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if taken {
            return Ok(None);
          }
        }
        tx.execute(
          "UPDATE users
              SET email         = COALESCE(?1, email),
                  password_hash = COALESCE(?2, password_hash),
                  updated_at    = ?3
            WHERE user_id = ?4",
          rusqlite::params![email_str, new_hash, at, user_id_str],
        )?;
        let email: String = tx.query_row(
          "SELECT email FROM users WHERE user_id = ?1",
          rusqlite::params![user_id_str],
          |r| r.get(0),
        )?;
        tx.commit()?;
        Ok(Some(email))
      })
      .await?;

    let Some(email) = updated else {
      return Err(Error::EmailTaken(new_email.unwrap_or_default()));
    };
    session.user.email = email;
    let identity = session.user.clone();
    self.establish(session.clone(), AuthEvent::UserUpdated(session)).await?;
    Ok(identity)
  }

  async fn reset_password_for_email<'a>(&'a self, email: &'a str) -> Result<()> {
    let email = email.trim().to_owned();
    let email_str = email.clone();
    let at = now();
    let reset_id = encode_uuid(Uuid::new_v4());

    let known: bool = self
      .conn
      .call(move |conn| {
        let user_id: Option<String> = conn
          .query_row(
            "SELECT user_id FROM users WHERE email = ?1",
            rusqlite::params![email_str],
            |r| r.get(0),
          )
          .optional()?;
        let Some(user_id) = user_id else {
          return Ok(false);
        };
        conn.execute(
          "INSERT INTO password_resets (reset_id, user_id, requested_at)
           VALUES (?1, ?2, ?3)",
          rusqlite::params![reset_id, user_id, at],
        )?;
        Ok(true)
      })
      .await?;

    debug!(known, "password reset requested");
    let _ = self.events.send(AuthEvent::PasswordRecovery { email });
    Ok(())
  }

  fn subscribe_auth(&self) -> broadcast::Receiver<AuthEvent> { self.events.subscribe() }

  // ── Profiles ──────────────────────────────────────────────────────────

  async fn get_profile(&self, id: Uuid) -> Result<Option<ProfileRow>> {
    let id_str = encode_uuid(id);
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM profiles WHERE profile_id = ?1", RawProfile::COLUMNS),
              rusqlite::params![id_str],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_row).transpose()
  }

  async fn find_profile_by_username<'a>(
    &'a self,
    username: &'a str,
  ) -> Result<Option<ProfileRow>> {
    let username = username.to_owned();
    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {} FROM profiles WHERE username = ?1", RawProfile::COLUMNS),
              rusqlite::params![username],
              RawProfile::from_row,
            )
            .optional()?,
        )
      })
      .await?;
    raw.map(RawProfile::into_row).transpose()
  }

  async fn insert_profile(&self, row: NewProfileRow) -> Result<ProfileRow> {
    let username = row.username.clone();
    let id_str = encode_uuid(row.id);
    let at = now();

    let inserted: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let taken: bool = tx
          .query_row(
            "SELECT 1 FROM profiles WHERE username = ?1",
            rusqlite::params![row.username],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if taken {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO profiles (profile_id, username, name, email, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
          rusqlite::params![id_str, row.username, row.name, row.email, at],
        )?;
        tx.commit()?;
        Ok(Some(RawProfile {
          profile_id: id_str,
          username:   row.username,
          name:       row.name,
          email:      row.email,
          created_at: at.clone(),
          updated_at: at,
        }))
      })
      .await?;

    inserted.ok_or(Error::UsernameTaken(username))?.into_row()
  }

  async fn update_profile(
    &self,
    id: Uuid,
    patch: ProfilePatch,
  ) -> Result<Option<ProfileRow>> {
    let id_str = encode_uuid(id);
    let at = now();
    let wanted = patch.username.clone();

    enum Outcome {
      Updated(RawProfile),
      Missing,
      UsernameTaken,
    }

    let outcome: Outcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        if let Some(username) = &patch.username {
          let taken: bool = tx
            .query_row(
              "SELECT 1 FROM profiles WHERE username = ?1 AND profile_id <> ?2",
              rusqlite::params![username, id_str],
              |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
          if taken {
            return Ok(Outcome::UsernameTaken);
          }
        }
        let changed = tx.execute(
          "UPDATE profiles
              SET username   = COALESCE(?1, username),
                  name       = COALESCE(?2, name),
                  email      = COALESCE(?3, email),
                  updated_at = ?4
            WHERE profile_id = ?5",
          rusqlite::params![patch.username, patch.name, patch.email, at, id_str],
        )?;
        if changed == 0 {
          return Ok(Outcome::Missing);
        }
        let raw = tx.query_row(
          &format!("SELECT {} FROM profiles WHERE profile_id = ?1", RawProfile::COLUMNS),
          rusqlite::params![id_str],
          RawProfile::from_row,
        )?;
        tx.commit()?;
        Ok(Outcome::Updated(raw))
      })
      .await?;

    match outcome {
      Outcome::Updated(raw) => Ok(Some(raw.into_row()?)),
      Outcome::Missing => Ok(None),
      Outcome::UsernameTaken => Err(Error::UsernameTaken(wanted.unwrap_or_default())),
    }
  }

  // ── Plans ─────────────────────────────────────────────────────────────

  async fn select_plans(&self, query: PlanQuery) -> Result<Vec<PlanRow>> {
    if query.ids.as_ref().is_some_and(Vec::is_empty) {
      return Ok(Vec::new());
    }

    let mut conditions: Vec<String> = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    match query.viewer {
      Some(viewer) => {
        conditions.push("(w.is_public = 1 OR w.owner_id = ?)".into());
        args.push(Value::Text(encode_uuid(viewer)));
      }
      None => conditions.push("w.is_public = 1".into()),
    }
    if let Some(owner) = query.owner {
      conditions.push("w.owner_id = ?".into());
      args.push(Value::Text(encode_uuid(owner)));
    }
    if query.public_only {
      conditions.push("w.is_public = 1".into());
    }
    if let Some(ids) = &query.ids {
      conditions.push(format!("w.workout_id IN ({})", placeholders(ids.len())));
      args.extend(ids.iter().map(|id| Value::Text(encode_uuid(*id))));
    }

    let order = match query.order {
      PlanOrder::Newest => "w.created_at DESC, w.rowid DESC",
      PlanOrder::MostLiked => "w.like_count DESC, w.created_at DESC, w.rowid DESC",
    };
    let sql = format!(
      "SELECT {} FROM workouts w
         LEFT JOIN profiles p ON p.profile_id = w.owner_id
        WHERE {}
        ORDER BY {order}",
      RawPlan::COLUMNS,
      conditions.join(" AND "),
    );
    let viewer_str = query.viewer.map(encode_uuid);

    let tree: RawTree = self
      .conn
      .call(move |conn| {
        let mut tree = RawTree::default();

        let mut stmt = conn.prepare(&sql)?;
        tree.plans = stmt
          .query_map(rusqlite::params_from_iter(args.iter()), RawPlan::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        if tree.plans.is_empty() {
          return Ok(tree);
        }

        let plan_ids: Vec<&str> =
          tree.plans.iter().map(|p| p.workout_id.as_str()).collect();
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM workout_days WHERE workout_id IN ({}) ORDER BY position",
          RawDay::COLUMNS,
          placeholders(plan_ids.len()),
        ))?;
        tree.days = stmt
          .query_map(rusqlite::params_from_iter(plan_ids.iter()), RawDay::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        if tree.days.is_empty() {
          return Ok(tree);
        }

        let day_ids: Vec<&str> = tree.days.iter().map(|d| d.day_id.as_str()).collect();
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM exercises WHERE day_id IN ({}) ORDER BY position",
          RawExercise::COLUMNS,
          placeholders(day_ids.len()),
        ))?;
        tree.exercises = stmt
          .query_map(rusqlite::params_from_iter(day_ids.iter()), RawExercise::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        // Weight records are private to their author.
        let Some(viewer) = viewer_str else {
          return Ok(tree);
        };
        if tree.exercises.is_empty() {
          return Ok(tree);
        }
        let mut record_args: Vec<&str> =
          tree.exercises.iter().map(|e| e.exercise_id.as_str()).collect();
        let n = record_args.len();
        record_args.push(viewer.as_str());
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM weight_records
            WHERE exercise_id IN ({}) AND profile_id = ?
            ORDER BY created_at, rowid",
          RawWeightRecord::COLUMNS,
          placeholders(n),
        ))?;
        let records = stmt
          .query_map(
            rusqlite::params_from_iter(record_args.iter()),
            RawWeightRecord::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        tree.records = records;
        Ok(tree)
      })
      .await?;

    tree.assemble()
  }

  async fn insert_plan(&self, row: NewPlanRow) -> Result<PlanRow> {
    let plan_id = Uuid::new_v4();
    let id_str = encode_uuid(plan_id);
    let owner_str = encode_uuid(row.owner_id);
    let at = now();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO workouts
             (workout_id, owner_id, name, description, glyph, is_public,
              like_count, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7, ?7)",
          rusqlite::params![
            id_str,
            owner_str,
            row.name,
            row.description,
            row.glyph,
            row.is_public,
            at,
          ],
        )?;
        Ok(())
      })
      .await?;

    self
      .fetch_plan_row(plan_id)
      .await?
      .ok_or(Error::NotFound { table: "workouts", id: plan_id })
  }

  async fn insert_day(&self, row: NewDayRow) -> Result<DayRow> {
    let day_id = Uuid::new_v4();
    let id_str = encode_uuid(day_id);
    let plan_str = encode_uuid(row.workout_id);
    let (weekday, division) = (row.weekday.clone(), row.division.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO workout_days
             (day_id, workout_id, weekday, division, is_rest_day, position)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id_str,
            plan_str,
            weekday,
            division,
            row.is_rest_day,
            row.position,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(DayRow {
      id:          day_id,
      workout_id:  row.workout_id,
      weekday:     row.weekday,
      division:    row.division,
      is_rest_day: row.is_rest_day,
      position:    row.position,
      exercises:   None,
    })
  }

  async fn insert_exercise(&self, row: NewExerciseRow) -> Result<ExerciseRow> {
    let exercise_id = Uuid::new_v4();
    let id_str = encode_uuid(exercise_id);
    let day_str = encode_uuid(row.day_id);
    let (name, reps) = (row.name.clone(), row.reps.clone());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO exercises (exercise_id, day_id, name, sets, reps, position)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, day_str, name, row.sets, reps, row.position],
        )?;
        Ok(())
      })
      .await?;

    Ok(ExerciseRow {
      id:             exercise_id,
      day_id:         row.day_id,
      name:           row.name,
      sets:           row.sets,
      reps:           row.reps,
      position:       row.position,
      weight_records: None,
    })
  }

  async fn update_plan(
    &self,
    id: Uuid,
    owner_id: Uuid,
    patch: PlanPatch,
  ) -> Result<Option<PlanRow>> {
    let id_str = encode_uuid(id);
    let owner_str = encode_uuid(owner_id);
    let set_description = patch.description.is_some();
    let description = patch.description.flatten();
    let at = now();

    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE workouts
              SET name        = COALESCE(?1, name),
                  description = CASE WHEN ?2 THEN ?3 ELSE description END,
                  glyph       = COALESCE(?4, glyph),
                  is_public   = COALESCE(?5, is_public),
                  updated_at  = ?6
            WHERE workout_id = ?7 AND owner_id = ?8",
          rusqlite::params![
            patch.name,
            set_description,
            description,
            patch.glyph,
            patch.is_public,
            at,
            id_str,
            owner_str,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(None);
    }
    self.fetch_plan_row(id).await
  }

  async fn delete_plan(&self, id: Uuid, owner_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let owner_str = encode_uuid(owner_id);
    let deleted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM workouts WHERE workout_id = ?1 AND owner_id = ?2",
          rusqlite::params![id_str, owner_str],
        )?)
      })
      .await?;
    Ok(deleted > 0)
  }

  async fn delete_days(&self, plan_id: Uuid, owner_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(plan_id);
    let owner_str = encode_uuid(owner_id);
    let owned: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let owned: bool = tx
          .query_row(
            "SELECT 1 FROM workouts WHERE workout_id = ?1 AND owner_id = ?2",
            rusqlite::params![id_str, owner_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if owned {
          tx.execute(
            "DELETE FROM workout_days WHERE workout_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        tx.commit()?;
        Ok(owned)
      })
      .await?;
    Ok(owned)
  }

  // ── Weight records ────────────────────────────────────────────────────

  async fn insert_weight_record(&self, row: NewWeightRecordRow) -> Result<WeightRecordRow> {
    let record_id = encode_uuid(Uuid::new_v4());
    let exercise_str = encode_uuid(row.exercise_id);
    let profile_str = encode_uuid(row.profile_id);
    let at = now();

    let raw: Option<RawWeightRecord> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM exercises WHERE exercise_id = ?1",
            rusqlite::params![exercise_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !exists {
          return Ok(None);
        }
        tx.execute(
          "INSERT INTO weight_records
             (record_id, exercise_id, profile_id, weight, notes, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            record_id,
            exercise_str,
            profile_str,
            row.weight,
            row.notes,
            at,
          ],
        )?;
        tx.commit()?;
        Ok(Some(RawWeightRecord {
          record_id,
          exercise_id: exercise_str,
          profile_id: profile_str,
          weight: row.weight,
          notes: row.notes,
          created_at: at,
        }))
      })
      .await?;

    raw
      .ok_or(Error::NotFound { table: "exercises", id: row.exercise_id })?
      .into_row()
  }

  async fn select_weight_records(
    &self,
    exercise_id: Uuid,
    profile_id: Uuid,
  ) -> Result<Vec<WeightRecordRow>> {
    let exercise_str = encode_uuid(exercise_id);
    let profile_str = encode_uuid(profile_id);
    let raws: Vec<RawWeightRecord> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {} FROM weight_records
            WHERE exercise_id = ?1 AND profile_id = ?2
            ORDER BY created_at, rowid",
          RawWeightRecord::COLUMNS
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![exercise_str, profile_str], RawWeightRecord::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawWeightRecord::into_row).collect()
  }

  // ── Links ─────────────────────────────────────────────────────────────

  async fn insert_link(
    &self,
    kind: LinkKind,
    profile_id: Uuid,
    plan_id: Uuid,
  ) -> Result<LinkOutcome> {
    let table = link_table(kind);
    let profile_str = encode_uuid(profile_id);
    let plan_str = encode_uuid(plan_id);
    let at = now();

    let outcome: Option<LinkOutcome> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let visible: bool = tx
          .query_row(
            "SELECT 1 FROM workouts
              WHERE workout_id = ?1 AND (is_public = 1 OR owner_id = ?2)",
            rusqlite::params![plan_str, profile_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        if !visible {
          return Ok(None);
        }
        let inserted = tx.execute(
          &format!(
            "INSERT OR IGNORE INTO {table} (profile_id, workout_id, created_at)
             VALUES (?1, ?2, ?3)"
          ),
          rusqlite::params![profile_str, plan_str, at],
        )?;
        if inserted == 0 {
          return Ok(Some(LinkOutcome::AlreadyExists));
        }
        if kind == LinkKind::Liked {
          tx.execute(
            "UPDATE workouts SET like_count = like_count + 1 WHERE workout_id = ?1",
            rusqlite::params![plan_str],
          )?;
        }
        tx.commit()?;
        Ok(Some(LinkOutcome::Created))
      })
      .await?;

    outcome.ok_or(Error::NotFound { table: "workouts", id: plan_id })
  }

  async fn delete_link(&self, kind: LinkKind, profile_id: Uuid, plan_id: Uuid) -> Result<bool> {
    let table = link_table(kind);
    let profile_str = encode_uuid(profile_id);
    let plan_str = encode_uuid(plan_id);

    let removed: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let deleted = tx.execute(
          &format!("DELETE FROM {table} WHERE profile_id = ?1 AND workout_id = ?2"),
          rusqlite::params![profile_str, plan_str],
        )?;
        if deleted > 0 && kind == LinkKind::Liked {
          tx.execute(
            "UPDATE workouts SET like_count = MAX(like_count - 1, 0) WHERE workout_id = ?1",
            rusqlite::params![plan_str],
          )?;
        }
        tx.commit()?;
        Ok(deleted > 0)
      })
      .await?;
    Ok(removed)
  }

  async fn select_links(&self, kind: LinkKind, profile_id: Uuid) -> Result<Vec<LinkRow>> {
    let table = link_table(kind);
    let profile_str = encode_uuid(profile_id);

    let raws: Vec<RawLink> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT profile_id, workout_id, created_at FROM {table}
            WHERE profile_id = ?1
            ORDER BY created_at DESC, rowid DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![profile_str], |r| {
            Ok(RawLink {
              profile_id: r.get(0)?,
              workout_id: r.get(1)?,
              created_at: r.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawLink::into_row).collect()
  }
}
