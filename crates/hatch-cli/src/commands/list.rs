//! Implementation of the `hatch list` command.

use hatch_core::domain::{Deadline, ProjectKind, TemplateInfo};

use crate::{
    cli::{GlobalArgs, ListArgs, ListFormat},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    wiring,
};

pub fn execute(
    args: ListArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let settings = config.core_settings(&global);
    let deadline = Deadline::from_timeout(settings.timeout);
    let service = wiring::scaffold_service(&config, &settings, &deadline)?;

    let kind: ProjectKind = args.kind.into();
    let templates = service.list_templates(kind)?;

    match args.format {
        ListFormat::Table => {
            if templates.is_empty() {
                output.warning(&format!("No {kind} templates available"))?;
                return Ok(());
            }
            output.header(&format!("Available {kind} templates:"))?;
            for template in &templates {
                output.print(&table_row(template))?;
            }
        }
        ListFormat::List => {
            for template in &templates {
                println!("{}", template.name);
            }
        }
        ListFormat::Json => {
            // Printed directly: JSON must stay parseable in pipes and quiet mode.
            let json =
                serde_json::to_string_pretty(&templates).map_err(|e| CliError::ConfigError {
                    message: format!("Failed to serialise templates: {e}"),
                    source: Some(Box::new(e)),
                })?;
            println!("{json}");
        }
    }

    Ok(())
}

fn table_row(template: &TemplateInfo) -> String {
    let source = if template.is_remote_repo {
        "git".to_string()
    } else {
        format!("{}@{}", template.canonical_id, template.version)
    };
    format!("  {:<24} {source}", template.name)
}
