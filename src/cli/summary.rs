//! Plain-text rendering of a tenant report for terminals.

use std::fmt::Write;

use console::style;

use crate::fanout::CollectionStatus;
use crate::models::Advisory;
use crate::pipeline::TenantReport;

pub fn render(report: &TenantReport, colored: bool) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} {}  {}",
        style("Tenant posture").bold().force_styling(colored),
        report.tenant_id,
        style(format!("run {} at {}", report.run_id, report.generated_at.to_rfc3339())).dim().force_styling(colored),
    );

    if let Some(defender) = &report.defender {
        section(&mut out, "Microsoft Defender", defender.snapshot.available, &defender.snapshot.status, &defender.advisories, colored);
    }
    if let Some(entra) = &report.entra {
        section(&mut out, "Microsoft Entra", entra.snapshot.available, &entra.snapshot.status, &entra.advisories, colored);
        for (label, status, error) in [
            ("Internet Access", entra.snapshot.network_access_summary.status, &entra.snapshot.network_access_summary.error),
            ("Private Access", entra.snapshot.private_access_summary.status, &entra.snapshot.private_access_summary.error),
        ] {
            if let Some(error) = error {
                let _ = writeln!(out, "  {} {}: {} ({})", style("!").yellow().force_styling(colored), label, status.as_str(), error);
            }
        }
    }
    out
}

fn section(out: &mut String, title: &str, available: bool, status: &CollectionStatus, advisories: &[Advisory], colored: bool) {
    let state = if available {
        style("available").green().force_styling(colored)
    } else {
        style("unavailable").red().force_styling(colored)
    };
    let _ = writeln!(out, "\n{} ({})", style(title).cyan().bold().force_styling(colored), state);

    if status.activation_needed {
        let _ = writeln!(out, "  {} {}", style("!").yellow().force_styling(colored), status.activation_message);
    }
    for (label, names) in [
        ("Not licensed", &status.missing_features),
        ("Permission denied", &status.permission_denied),
        ("Failed", &status.failed),
    ] {
        if !names.is_empty() {
            let _ = writeln!(out, "  {}: {}", label, names.join(", "));
        }
    }

    for advisory in advisories {
        let marker = if advisory.priority.is_empty() {
            style("[ok]".to_string()).green()
        } else {
            style(format!("[{}]", advisory.priority)).yellow().bold()
        };
        let _ = writeln!(out, "  {} {}: {}", marker.force_styling(colored), advisory.feature, advisory.observation);
        if !advisory.recommendation.is_empty() {
            let _ = writeln!(out, "        -> {}", advisory.recommendation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defender::DefenderSnapshot;
    use crate::insights::DefenderInsights;
    use crate::pipeline::orchestrator::{tool_version, BackendReport};

    #[test]
    fn test_renders_status_and_advisories_without_color() {
        let mut snapshot = DefenderSnapshot::new();
        snapshot.status.record_missing_feature("secure_scores");
        let advisory = Advisory::new("Defender", "Microsoft Defender XDR", "Active", "Investigate 1 incident", "High", "Success")
            .unwrap();
        let report = TenantReport {
            run_id: "run-1".into(),
            generated_at: chrono::Utc::now(),
            tool_version: tool_version(),
            tenant_id: "contoso.onmicrosoft.com".into(),
            defender: Some(BackendReport { snapshot, insights: DefenderInsights::default(), advisories: vec![advisory] }),
            entra: None,
        };

        let text = render(&report, false);
        assert!(text.contains("Microsoft Defender (unavailable)"));
        assert!(text.contains("Not licensed: secure_scores"));
        assert!(text.contains("[High] Microsoft Defender XDR: Active"));
        assert!(text.contains("-> Investigate 1 incident"));
        assert!(!text.contains("Microsoft Entra"));
        assert!(!text.contains('\u{1b}'));
    }
}
