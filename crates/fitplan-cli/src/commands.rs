//! Command dispatch over a started [`Client`].

use std::{
  io::{self, BufRead, Write},
  path::Path,
};

use anyhow::{Context as _, bail};
use fitplan_core::{
  Backend,
  link::{LinkKind, LinkOutcome},
  plan::{NewDay, NewPlan},
  row::PlanPatch,
  validate,
};
use fitplan_sync::{Client, CollectionKind, LoadState, ProfileUpdate, Registration};
use serde::Deserialize;
use uuid::Uuid;

use crate::{Command, PlansCommand, ProfileCommand, UpdateArgs, render::Output};

/// A days-only definition file; a full plan file is accepted as well.
#[derive(Deserialize)]
struct DaysFile {
  #[serde(default)]
  days: Vec<NewDay>,
}

pub async fn run<B: Backend + 'static>(
  client: &Client<B>,
  command: Command,
  out: Output,
) -> anyhow::Result<()> {
  match command {
    // ── Session ─────────────────────────────────────────────────────────
    Command::Register { email, name, username, password } => {
      let (password, confirm_password) = match password {
        Some(p) => (p.clone(), p),
        None => (prompt("Password: ")?, prompt("Confirm password: ")?),
      };
      client
        .session
        .register(Registration { email, password, confirm_password, name, username })
        .await?;
      let profile = client.gateway.current_profile().await;
      match profile {
        Some(p) => out.message(&format!("Welcome, {}! Your username is @{}.", p.name, p.username)),
        None => out.message("Registered."),
      }
    }
    Command::Login { email, password } => {
      let password = match password {
        Some(p) => p,
        None => prompt("Password: ")?,
      };
      let identity = client.session.login(&email, &password).await?;
      out.message(&format!("Signed in as {}.", identity.email))
    }
    Command::Logout => {
      client.logout().await;
      out.message("Signed out.")
    }
    Command::Whoami => {
      let Some(identity) = client.session.identity() else {
        bail!("not signed in");
      };
      let profile = client.gateway.try_current_profile().await?;
      out.identity(&identity, profile.as_ref())
    }
    Command::ResetPassword { email } => {
      client.session.reset_password(&email).await?;
      out.message("If an account exists for that address, a reset email is on its way.")
    }

    // ── Profiles ────────────────────────────────────────────────────────
    Command::Profile { action: ProfileCommand::Show { username } } => {
      let profile = match username {
        Some(name) => client
          .gateway
          .try_profile_by_username(&name)
          .await?
          .with_context(|| format!("no user named {name:?}"))?,
        None => client
          .gateway
          .try_current_profile()
          .await?
          .context("not signed in")?,
      };
      let stats = client.gateway.try_profile_stats(profile.id).await?;
      out.profile(&profile, stats)
    }
    Command::Profile {
      action: ProfileCommand::Update { name, username, email, password },
    } => {
      let (password, confirm_password) = if password {
        (Some(prompt("New password: ")?), Some(prompt("Confirm password: ")?))
      } else {
        (None, None)
      };
      let profile = client
        .session
        .update_profile(ProfileUpdate { name, username, email, password, confirm_password })
        .await?;
      let stats = client.gateway.try_profile_stats(profile.id).await?;
      out.profile(&profile, stats)
    }

    // ── Plans ───────────────────────────────────────────────────────────
    Command::Plans { which } => {
      let plans = match which {
        PlansCommand::Mine => collection(client, CollectionKind::Own).await?,
        PlansCommand::Saved => collection(client, CollectionKind::Saved).await?,
        PlansCommand::Explore => collection(client, CollectionKind::Public).await?,
        PlansCommand::User { username } => {
          client.gateway.try_fetch_public_plans_by(&username).await?
        }
      };
      out.plans(&plans)
    }
    Command::Show { plan } => {
      let plan = client
        .gateway
        .try_fetch_plan(plan)
        .await?
        .with_context(|| format!("plan {plan} not found"))?;
      out.plan(&plan)
    }
    Command::Create { file } => {
      let plan: NewPlan = read_toml(&file)?;
      let id = client.gateway.try_create_plan(plan).await?;
      out.message(&format!("Created plan {id}."))
    }
    Command::Update(args) => {
      let plan_id = args.plan;
      let patch = plan_patch(args);
      if !client.gateway.try_update_plan(plan_id, patch).await? {
        bail!("plan {plan_id} not found or not yours");
      }
      out.message("Plan updated.")
    }
    Command::Resave { plan, file } => {
      let DaysFile { days } = read_toml(&file)?;
      if !client.gateway.try_replace_plan_days(plan, days).await? {
        bail!("plan {plan} not found or not yours");
      }
      out.message("Plan days replaced.")
    }
    Command::Delete { plan } => {
      if !client.gateway.try_delete_plan(plan).await? {
        bail!("plan {plan} not found or not yours");
      }
      out.message("Plan deleted.")
    }

    // ── Links ───────────────────────────────────────────────────────────
    Command::Like { plan } => link(client, LinkKind::Liked, plan, out).await,
    Command::Save { plan } => link(client, LinkKind::Saved, plan, out).await,
    Command::Unlike { plan } => unlink(client, LinkKind::Liked, plan, out).await,
    Command::Unsave { plan } => unlink(client, LinkKind::Saved, plan, out).await,

    // ── Weight records ──────────────────────────────────────────────────
    Command::Log { exercise, weight, note } => {
      let weight = validate::parse_weight(&weight)?;
      let record = client
        .gateway
        .try_add_weight_record(exercise, weight, note)
        .await?;
      out.message(&format!("Logged {} kg.", record.weight))
    }
    Command::History { exercise } => {
      let records = client.gateway.try_fetch_weight_history(exercise).await?;
      out.history(&records)
    }
  }
}

/// Refresh one collection through the store and return its plans.
async fn collection<B: Backend + 'static>(
  client: &Client<B>,
  kind: CollectionKind,
) -> anyhow::Result<Vec<fitplan_core::plan::WorkoutPlan>> {
  client.store.refresh(kind).await;
  let snapshot = client.store.snapshot(kind);
  if let LoadState::Failed(reason) = &snapshot.state {
    bail!("failed to load plans: {reason}");
  }
  Ok(snapshot.plans)
}

async fn link<B: Backend + 'static>(
  client: &Client<B>,
  kind: LinkKind,
  plan: Uuid,
  out: Output,
) -> anyhow::Result<()> {
  match client.gateway.try_link(kind, plan).await? {
    LinkOutcome::Created => out.message(&format!("Plan {kind}.")),
    LinkOutcome::AlreadyExists => out.message(&format!("Plan already {kind}.")),
  }
}

async fn unlink<B: Backend + 'static>(
  client: &Client<B>,
  kind: LinkKind,
  plan: Uuid,
  out: Output,
) -> anyhow::Result<()> {
  if client.gateway.try_unlink(kind, plan).await? {
    out.message(&format!("Plan no longer {kind}."))
  } else {
    out.message(&format!("Plan was not {kind}."))
  }
}

fn plan_patch(args: UpdateArgs) -> PlanPatch {
  let description = if args.clear_description {
    Some(None)
  } else {
    args.description.map(Some)
  };
  let is_public = match (args.public, args.private) {
    (true, _) => Some(true),
    (_, true) => Some(false),
    _ => None,
  };
  PlanPatch { name: args.name, description, glyph: args.glyph, is_public }
}

fn read_toml<T: for<'de> Deserialize<'de>>(path: &Path) -> anyhow::Result<T> {
  let text =
    std::fs::read_to_string(path).with_context(|| format!("failed to read {path:?}"))?;
  toml::from_str(&text).with_context(|| format!("failed to parse {path:?}"))
}

/// Read one line from stdin after printing `label`.
fn prompt(label: &str) -> anyhow::Result<String> {
  print!("{label}");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(plan: Uuid) -> UpdateArgs {
    UpdateArgs {
      plan,
      name: None,
      description: None,
      clear_description: false,
      glyph: None,
      public: false,
      private: false,
    }
  }

  #[test]
  fn clear_description_sets_explicit_null() {
    let mut a = args(Uuid::nil());
    a.clear_description = true;
    assert_eq!(plan_patch(a).description, Some(None));
  }

  #[test]
  fn visibility_flags_map_to_patch() {
    let mut a = args(Uuid::nil());
    a.private = true;
    assert_eq!(plan_patch(a).is_public, Some(false));
    assert_eq!(plan_patch(args(Uuid::nil())).is_public, None);
  }

  #[test]
  fn days_file_accepts_a_full_plan() {
    let file: DaysFile = toml::from_str(
      r#"
        name = "PPL"

        [[days]]
        weekday = "Monday"
        is_rest_day = true

        [[days]]
        weekday = "Tuesday"
        division = "Push"
        exercises = [{ name = "Bench Press", sets = 3, reps = "8-12" }]
      "#,
    )
    .unwrap();
    assert_eq!(file.days.len(), 2);
    assert_eq!(file.days[1].exercises[0].name, "Bench Press");
  }
}
