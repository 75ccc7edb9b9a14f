//! Text and JSON output for command results.

use fitplan_core::{
  auth::Identity,
  plan::{WeightRecord, WorkoutPlan},
  profile::{Profile, ProfileStats},
};
use serde::Serialize;

#[derive(Debug, Clone, Copy)]
pub struct Output {
  pub json: bool,
}

#[derive(Serialize)]
struct ProfileView<'a> {
  #[serde(flatten)]
  profile: &'a Profile,
  stats:   ProfileStats,
}

impl Output {
  fn emit_json<T: Serialize + ?Sized>(&self, value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
  }

  pub fn message(&self, text: &str) -> anyhow::Result<()> {
    if self.json {
      return self.emit_json(&serde_json::json!({ "message": text }));
    }
    println!("{text}");
    Ok(())
  }

  pub fn identity(&self, identity: &Identity, profile: Option<&Profile>) -> anyhow::Result<()> {
    if self.json {
      return self.emit_json(&serde_json::json!({ "identity": identity, "profile": profile }));
    }
    match profile {
      Some(p) => println!("{} (@{}) <{}>", p.name, p.username, identity.email),
      None => println!("<{}> (no profile)", identity.email),
    }
    Ok(())
  }

  pub fn profile(&self, profile: &Profile, stats: ProfileStats) -> anyhow::Result<()> {
    if self.json {
      return self.emit_json(&ProfileView { profile, stats });
    }
    println!("{} (@{})", profile.name, profile.username);
    println!("  joined   {}", profile.created_at.format("%Y-%m-%d"));
    println!(
      "  plans    {} ({} public)",
      stats.plan_count, stats.public_plan_count
    );
    println!("  likes    {}", stats.likes_received);
    Ok(())
  }

  pub fn plans(&self, plans: &[WorkoutPlan]) -> anyhow::Result<()> {
    if self.json {
      return self.emit_json(plans);
    }
    if plans.is_empty() {
      println!("No plans.");
      return Ok(());
    }
    for plan in plans {
      println!("{}", plan_line(plan));
    }
    Ok(())
  }

  pub fn plan(&self, plan: &WorkoutPlan) -> anyhow::Result<()> {
    if self.json {
      return self.emit_json(plan);
    }
    println!("{}", plan_line(plan));
    if let Some(description) = &plan.description {
      println!("  {description}");
    }
    for day in &plan.days {
      if day.is_rest_day {
        println!("  {:<10} rest", day.weekday);
        continue;
      }
      println!("  {:<10} {}", day.weekday, day.division);
      for ex in &day.exercises {
        let latest = ex
          .latest_weight()
          .map(|w| format!("  last {w} kg"))
          .unwrap_or_default();
        println!("    {} {} x {}{latest}  [{}]", ex.name, ex.sets, ex.reps, ex.id);
      }
    }
    Ok(())
  }

  /// Records arrive oldest first and are printed most recent first.
  pub fn history(&self, records: &[WeightRecord]) -> anyhow::Result<()> {
    let newest_first: Vec<&WeightRecord> = records.iter().rev().collect();
    if self.json {
      return self.emit_json(&newest_first);
    }
    if newest_first.is_empty() {
      println!("No records.");
      return Ok(());
    }
    for r in newest_first {
      let note = r.notes.as_deref().map(|n| format!("  {n}")).unwrap_or_default();
      println!("{}  {} kg{note}", r.recorded_at.format("%Y-%m-%d %H:%M"), r.weight);
    }
    Ok(())
  }
}

fn plan_line(plan: &WorkoutPlan) -> String {
  let mut flags = String::new();
  if plan.is_public {
    flags.push_str(" public");
  }
  if plan.is_liked {
    flags.push_str(" liked");
  }
  if plan.is_saved {
    flags.push_str(" saved");
  }
  format!(
    "{} {}  by @{}  {} days  ♥ {}{flags}  [{}]",
    plan.glyph,
    plan.name,
    plan.owner_username,
    plan.training_days(),
    plan.like_count,
    plan.id
  )
}
