use clap::{Parser, Subcommand};
use element_resolver::{Coordinates, Selector};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "element-resolver")]
#[command(about = "Inspect and seed the element resolver's selector memory")]
#[command(
    long_about = "Reads and updates the selector memory document used by the element resolver, and runs the vision locator against saved screenshots. All output is JSON on stdout."
)]
pub struct Cli {
    /// Path of the selector memory document (defaults to the local data directory)
    #[arg(long, global = true, env = "ELEMENT_RESOLVER_MEMORY_PATH")]
    pub memory: Option<PathBuf>,

    /// Log at debug level
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show aggregate memory statistics
    Stats,
    /// List every remembered element of an app
    Mappings {
        #[arg(long)]
        app: String,
    },
    /// Show one element with its selectors, best first
    Show(ElementArgs),
    /// Record that a selector located an element
    Record {
        #[command(flatten)]
        element: ElementArgs,
        /// Selector as kind:value, e.g. id:btn_post or text:Share
        #[arg(long, value_parser = parse_selector)]
        selector: Selector,
        /// Starting confidence for a selector not seen before
        #[arg(long, default_value_t = 1.0)]
        confidence: f64,
        /// Where the element was found, as x,y
        #[arg(long, value_parser = parse_coordinates)]
        at: Option<Coordinates>,
    },
    /// Record that a selector failed to locate an element
    Fail {
        #[command(flatten)]
        element: ElementArgs,
        #[arg(long, value_parser = parse_selector)]
        selector: Selector,
    },
    /// Store what an element looks like, for future vision lookups
    Describe {
        #[command(flatten)]
        element: ElementArgs,
        #[arg(long)]
        text: String,
    },
    /// Ask the vision model where an element is in a screenshot
    Locate {
        /// PNG or JPEG screenshot
        #[arg(long)]
        screenshot: PathBuf,
        /// What to look for, e.g. "post button"
        #[arg(long)]
        description: String,
        /// Screen width in pixels (defaults to the image width)
        #[arg(long)]
        width: Option<u32>,
        /// Screen height in pixels (defaults to the image height)
        #[arg(long)]
        height: Option<u32>,
    },
    /// Ask the vision model to describe a screenshot
    DescribeScreen {
        #[arg(long)]
        screenshot: PathBuf,
    },
}

#[derive(clap::Args, Debug)]
pub struct ElementArgs {
    /// Application identifier, e.g. com.example.social
    #[arg(long)]
    pub app: String,
    /// Element name, e.g. "post button"
    #[arg(long)]
    pub key: String,
}

fn parse_selector(s: &str) -> Result<Selector, String> {
    Selector::parse(s).map_err(|e| e.to_string())
}

fn parse_coordinates(s: &str) -> Result<Coordinates, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;
    use element_resolver::SelectorKind;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_record_command() {
        let cli = Cli::try_parse_from([
            "element-resolver",
            "record",
            "--app",
            "com.social",
            "--key",
            "post button",
            "--selector",
            "text:Share",
            "--confidence",
            "0.6",
            "--at",
            "900,2200",
        ])
        .unwrap();

        match cli.command {
            Commands::Record {
                element,
                selector,
                confidence,
                at,
            } => {
                assert_eq!(element.key, "post button");
                assert_eq!(selector.kind, SelectorKind::Text);
                assert_eq!(confidence, 0.6);
                assert_eq!(at, Some(Coordinates::new(900, 2200)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_bad_selector_is_rejected() {
        let result = Cli::try_parse_from([
            "element-resolver",
            "fail",
            "--app",
            "com.social",
            "--key",
            "post",
            "--selector",
            "Share",
        ]);
        assert!(result.is_err());
    }
}
