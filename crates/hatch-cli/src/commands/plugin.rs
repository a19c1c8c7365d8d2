//! Runs any command clap does not know as a plugin.
//!
//! The raw arguments become a [`CommandContext`]: words are positional
//! arguments, `--key value`, `--key=value` and bare `--flag` become options
//! with camel-cased keys. Everything after `--` is positional.

use serde_json::Value;
use tracing::{debug, instrument};

use hatch_core::domain::{CommandContext, Deadline};

use crate::{
    cli::GlobalArgs,
    config::AppConfig,
    error::{CliError, CliResult, clamp_exit_code},
    wiring,
};

/// Returns the plugin's exit code.
#[instrument(skip_all)]
pub fn execute(argv: Vec<String>, global: GlobalArgs, config: AppConfig) -> CliResult<u8> {
    let Some((command, rest)) = argv.split_first() else {
        return Err(CliError::InvalidInput {
            message: "missing command".into(),
        });
    };
    let context = parse_context(rest);
    debug!(%command, args = ?context.args, "dispatching plugin");

    let settings = config.core_settings(&global);
    let dispatcher = wiring::plugin_dispatcher(&settings, &super::current_dir()?)?;
    let code = dispatcher.run(command, &context, &Deadline::from_timeout(settings.timeout))?;

    Ok(if code == 0 { 0 } else { clamp_exit_code(code) })
}

fn parse_context(args: &[String]) -> CommandContext {
    let mut context = CommandContext::default();
    let mut iter = args.iter().peekable();

    while let Some(arg) = iter.next() {
        if arg == "--" {
            context.args.extend(iter.by_ref().cloned());
            break;
        }
        let flag = arg
            .strip_prefix("--")
            .or_else(|| arg.strip_prefix('-'))
            .filter(|f| !f.is_empty());
        let Some(flag) = flag else {
            context.args.push(arg.clone());
            continue;
        };

        let (key, value) = match flag.split_once('=') {
            Some((key, value)) => (camel_case(key), Value::String(value.into())),
            None => {
                let key = camel_case(flag);
                let value = if key == "force" {
                    None
                } else {
                    iter.next_if(|next| !next.starts_with('-'))
                };
                (key, value.map_or(Value::Bool(true), |v| Value::String(v.clone())))
            }
        };
        set_option(&mut context, key, value);
    }
    context
}

fn set_option(context: &mut CommandContext, key: String, value: Value) {
    match (key.as_str(), value) {
        ("force", Value::Bool(b)) => context.force = b,
        ("force", Value::String(s)) => context.force = s != "false",
        ("projectName", Value::String(s)) => context.project_name = Some(s),
        ("componentName", Value::String(s)) => context.component_name = Some(s),
        ("targetPath", Value::String(s)) => context.target_path = Some(s.into()),
        (_, value) => {
            context.extra.insert(key, value);
        }
    }
}

/// `dry-run` and `dry_run` become `dryRun`. Leading underscores are kept.
fn camel_case(key: &str) -> String {
    let body = key.trim_start_matches('_');
    let mut out = key[..key.len() - body.len()].to_string();
    let mut upper = false;
    for c in body.chars() {
        if c == '-' || c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(args: &[&str]) -> CommandContext {
        let args: Vec<String> = args.iter().map(|s| s.to_string()).collect();
        parse_context(&args)
    }

    #[test]
    fn words_are_positional() {
        let ctx = parse(&["src", "lib"]);
        assert_eq!(ctx.args, vec!["src", "lib"]);
        assert!(ctx.extra.is_empty());
    }

    #[test]
    fn options_take_values() {
        let ctx = parse(&["--out-dir", "dist", "--level=3", "main.ts"]);
        assert_eq!(ctx.args, vec!["main.ts"]);
        assert_eq!(ctx.extra["outDir"], json!("dist"));
        assert_eq!(ctx.extra["level"], json!("3"));
    }

    #[test]
    fn bare_flags_are_true() {
        let ctx = parse(&["--watch", "--verbose"]);
        assert_eq!(ctx.extra["watch"], json!(true));
        assert_eq!(ctx.extra["verbose"], json!(true));
    }

    #[test]
    fn force_never_swallows_the_next_word() {
        let ctx = parse(&["--force", "demo"]);
        assert!(ctx.force);
        assert_eq!(ctx.args, vec!["demo"]);
    }

    #[test]
    fn known_options_fill_typed_fields() {
        let ctx = parse(&["--project-name", "app", "--target-path=/tmp/x"]);
        assert_eq!(ctx.project_name.as_deref(), Some("app"));
        assert_eq!(ctx.target_path, Some("/tmp/x".into()));
    }

    #[test]
    fn double_dash_ends_options() {
        let ctx = parse(&["--", "--not-a-flag", "x"]);
        assert_eq!(ctx.args, vec!["--not-a-flag", "x"]);
        assert!(ctx.extra.is_empty());
    }

    #[test]
    fn camel_casing() {
        assert_eq!(camel_case("dry-run"), "dryRun");
        assert_eq!(camel_case("dry_run"), "dryRun");
        assert_eq!(camel_case("force"), "force");
        assert_eq!(camel_case("_session"), "_session");
    }

    #[test]
    fn payload_keeps_positionals_then_options() {
        let ctx = parse(&["demo", "--_session", "s1", "--mode", "fast"]);
        let payload = ctx.to_payload();
        assert_eq!(payload[0], json!("demo"));
        assert_eq!(payload[1]["mode"], json!("fast"));
        assert!(payload[1].get("_session").is_none());
    }
}
