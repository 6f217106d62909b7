use applier_core::{IdentitySource, ReconcileAction, RunReport};
use colored::Colorize;
use tabled::builder::Builder;
use tabled::settings::Style;

pub fn print_success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

pub fn print_report(report: &RunReport) {
    if report.outcomes.is_empty() {
        println!("No groups configured.");
        return;
    }
    println!("{}", render_report(report));
}

fn render_report(report: &RunReport) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Local ID", "Remote ID", "Action", "Resolved via"]);
    for outcome in &report.outcomes {
        let action = match outcome.action {
            ReconcileAction::Created => "created".green().to_string(),
            ReconcileAction::Updated => "updated".cyan().to_string(),
        };
        let source = match outcome.source {
            Some(IdentitySource::Store) => "store",
            Some(IdentitySource::NameLookup) => "name lookup",
            None => "-",
        };
        builder.push_record([
            outcome.local_id.clone(),
            outcome.remote_id.to_string(),
            action,
            source.to_string(),
        ]);
    }
    builder.build().with(Style::rounded()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use applier_core::{Reconciled, RemoteId};

    #[test]
    fn report_table_lists_every_group() {
        colored::control::set_override(false);
        let report = RunReport {
            outcomes: vec![
                Reconciled {
                    local_id: "admins".into(),
                    remote_id: RemoteId::from(41),
                    action: ReconcileAction::Updated,
                    source: Some(IdentitySource::Store),
                },
                Reconciled {
                    local_id: "students".into(),
                    remote_id: RemoteId::from(57),
                    action: ReconcileAction::Created,
                    source: None,
                },
            ],
        };

        let table = render_report(&report);
        assert!(table.contains("admins"));
        assert!(table.contains("41"));
        assert!(table.contains("store"));
        assert!(table.contains("students"));
        assert!(table.contains("created"));
    }
}
