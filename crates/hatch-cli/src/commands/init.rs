//! Implementation of the `hatch init` command.
//!
//! Picks a template, then hands the request to the scaffold service. On a
//! terminal a non-empty project directory can be confirmed away instead of
//! requiring `--force`.

use tracing::{debug, info, instrument};

use hatch_core::application::{ApplicationError, ProjectRequest, ScaffoldService};
use hatch_core::domain::{Deadline, ProjectKind};
use hatch_core::error::HatchError;

use crate::{
    cli::{GlobalArgs, InitArgs},
    config::AppConfig,
    error::{CliError, CliResult},
    output::OutputManager,
    wiring,
};

#[instrument(skip_all, fields(name = %args.name))]
pub fn execute(
    args: InitArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let settings = config.core_settings(&global);
    let deadline = Deadline::from_timeout(settings.timeout);
    let service = wiring::scaffold_service(&config, &settings, &deadline)?;

    let kind: ProjectKind = args.kind.into();
    let template = match args.template {
        Some(template) => template,
        None => choose_template(&service, kind)?,
    };
    debug!(%template, %kind, "template selected");

    let mut request = ProjectRequest {
        kind,
        name: args.name,
        version: args.version,
        template,
        description: args.description,
        force: args.force,
        cwd: super::current_dir()?,
    };

    output.header(&format!("Creating {kind} '{}'...", request.name))?;
    let report = match create(&service, &request, &deadline, &output) {
        Err(err) if is_not_empty(&err) && confirm_overwrite(&request)? => {
            request.force = true;
            create(&service, &request, &deadline, &output)?
        }
        result => result?,
    };
    info!(strategy = %report.strategy, copied = report.copied, "init completed");

    output.success(&format!("Created {kind} '{}'", request.name))?;
    if kind == ProjectKind::Project && !output.is_quiet() {
        output.print("")?;
        output.print("Next steps:")?;
        output.print(&format!("  cd {}", request.name))?;
    }
    Ok(())
}

fn create(
    service: &ScaffoldService,
    request: &ProjectRequest,
    deadline: &Deadline,
    output: &OutputManager,
) -> CliResult<hatch_core::application::InstallReport> {
    let spinner = output.spinner("Fetching and installing template");
    let result = service.init(request, deadline);
    spinner.finish();
    result.map_err(CliError::from)
}

fn is_not_empty(err: &CliError) -> bool {
    matches!(
        err,
        CliError::Core(HatchError::Application(
            ApplicationError::DirectoryNotEmpty { .. }
        ))
    )
}

/// The only catalog entry, or the user's pick on a terminal.
fn choose_template(service: &ScaffoldService, kind: ProjectKind) -> CliResult<String> {
    let templates = service.list_templates(kind)?;
    if let [only] = templates.as_slice() {
        return Ok(only.canonical_id.clone());
    }

    #[cfg(feature = "interactive")]
    if !templates.is_empty() && prompt::is_interactive() {
        let names: Vec<String> = templates.iter().map(|t| t.name.clone()).collect();
        let index = prompt::select("Choose a template", &names)?;
        return Ok(templates[index].canonical_id.clone());
    }

    Err(CliError::TemplateRequired {
        available: templates.into_iter().map(|t| t.name).collect(),
    })
}

#[cfg(feature = "interactive")]
fn confirm_overwrite(request: &ProjectRequest) -> CliResult<bool> {
    if request.force || !prompt::is_interactive() {
        return Ok(false);
    }
    prompt::confirm(&format!(
        "'{}' is not empty. Delete its contents and continue?",
        request.name
    ))
}

#[cfg(not(feature = "interactive"))]
fn confirm_overwrite(_request: &ProjectRequest) -> CliResult<bool> {
    Ok(false)
}

#[cfg(feature = "interactive")]
mod prompt {
    use std::io::{self, IsTerminal};

    use dialoguer::{Confirm, FuzzySelect, theme::ColorfulTheme};

    use crate::error::{CliError, CliResult};

    pub fn is_interactive() -> bool {
        io::stdin().is_terminal() && io::stderr().is_terminal()
    }

    pub fn select(prompt: &str, items: &[String]) -> CliResult<usize> {
        FuzzySelect::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact()
            .map_err(|e| prompt_error("reading the template choice", e))
    }

    pub fn confirm(prompt: &str) -> CliResult<bool> {
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(|e| prompt_error("reading the confirmation", e))
    }

    fn prompt_error(message: &str, e: dialoguer::Error) -> CliError {
        CliError::IoError {
            message: message.into(),
            source: io::Error::other(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn directory_not_empty_is_recognised() {
        let err = CliError::Core(
            ApplicationError::DirectoryNotEmpty {
                path: PathBuf::from("app"),
            }
            .into(),
        );
        assert!(is_not_empty(&err));
        assert!(!is_not_empty(&CliError::InvalidInput {
            message: "x".into()
        }));
    }

    #[test]
    fn forced_requests_are_never_confirmed() {
        let request = ProjectRequest {
            kind: ProjectKind::Project,
            name: "app".into(),
            version: "1.0.0".into(),
            template: "t".into(),
            description: None,
            force: true,
            cwd: PathBuf::from("."),
        };
        assert!(!confirm_overwrite(&request).unwrap());
    }
}
