//! Derived figures shown on the allocation dashboards.

use std::collections::HashSet;

use crate::models::allocation::{BillingType, TeamUtilization, UtilizationSummary};
use crate::models::skill::EmployeeSkill;

fn normalized_stack(tech_stack: &[String]) -> HashSet<String> {
    tech_stack.iter().map(|t| t.to_lowercase()).collect()
}

/// Share of a project's tech stack the employee's skills cover, 0–100.
///
/// Each employee skill whose name appears in the stack (case-insensitive)
/// counts once; the count is divided by the stack size and rounded. An
/// empty stack scores 0.
pub fn skill_match_percent(skills: &[EmployeeSkill], tech_stack: &[String]) -> u32 {
    if tech_stack.is_empty() {
        return 0;
    }
    let stack = normalized_stack(tech_stack);
    let matched = skills
        .iter()
        .filter(|s| stack.contains(&s.skill_name.to_lowercase()))
        .count();
    ((matched as f64 / tech_stack.len() as f64) * 100.0).round() as u32
}

/// Whether any of the employee's skills appears in the tech stack.
pub fn has_any_skill_match(skills: &[EmployeeSkill], tech_stack: &[String]) -> bool {
    let stack = normalized_stack(tech_stack);
    skills
        .iter()
        .any(|s| stack.contains(&s.skill_name.to_lowercase()))
}

/// Counts team rows by allocation status. Rows without a recognised status
/// are on the bench.
pub fn summarize_utilization(rows: &[TeamUtilization]) -> UtilizationSummary {
    let mut summary = UtilizationSummary {
        total_employees: rows.len() as u64,
        ..UtilizationSummary::default()
    };
    for row in rows {
        match row.allocation_status {
            Some(BillingType::Billable) => summary.billable_count += 1,
            Some(BillingType::Investment) => summary.investment_count += 1,
            _ => summary.bench_count += 1,
        }
    }
    summary
}
