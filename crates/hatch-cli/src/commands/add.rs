//! Implementation of the `hatch add` command.

use tracing::instrument;

use hatch_core::application::ComponentRequest;
use hatch_core::domain::Deadline;

use crate::{
    cli::{AddArgs, GlobalArgs},
    config::AppConfig,
    error::CliResult,
    output::OutputManager,
    wiring,
};

#[instrument(skip_all, fields(name = %args.name))]
pub fn execute(
    args: AddArgs,
    global: GlobalArgs,
    config: AppConfig,
    output: OutputManager,
) -> CliResult<()> {
    let settings = config.core_settings(&global);
    let deadline = Deadline::from_timeout(settings.timeout);
    let service = wiring::scaffold_service(&config, &settings, &deadline)?;

    let relative = args.path.unwrap_or_else(|| config.component_dir.clone());
    let request = ComponentRequest {
        base_dir: super::current_dir()?.join(relative),
        name: args.name,
    };

    let spinner = output.spinner(&format!("Adding component '{}'", request.name));
    let result = service.add_component(&request, &deadline);
    spinner.finish();
    result?;

    output.success(&format!(
        "Added component '{}' in {}",
        request.name,
        request.base_dir.join(&request.name).display()
    ))?;
    Ok(())
}
