//! Implementation of the `stepwise skills` command.

use crate::context::Workspace;
use crate::error::Result;
use crate::skills::SkillRegistry;

pub fn cmd_skills(ws: &Workspace) -> Result<()> {
    let skills = ws.load_skills()?;

    if skills.is_empty() {
        println!("No skills registered.");
        println!("Add skills to {}", ws.skills_path.display());
        return Ok(());
    }

    println!("Skills ({}):", ws.skills_path.display());
    for (name, profile) in skills.iter() {
        println!();
        if skills.exclude.contains(name) {
            println!("  {} (excluded from decomposition)", name);
        } else {
            println!("  {}", name);
        }
        if !profile.description.is_empty() {
            println!("    Description: {}", profile.description);
        }
        if profile.triggers.is_empty() {
            println!("    Triggers:    {}", name);
        } else {
            println!("    Triggers:    {}", profile.triggers.join(", "));
        }
        if let Some(entry) = skills.resolve(name) {
            println!("    Entry point: {}", entry.entry_point);
            println!("    Command:     {}", entry.command);
            match entry.timeout {
                Some(t) => println!("    Timeout:     {}s", t.as_secs()),
                None => println!(
                    "    Timeout:     {}s (default)",
                    ws.config.step_timeout_seconds
                ),
            }
        }
    }
    Ok(())
}
