use clap::{Args, Parser, Subcommand};

/// venvcall - run a Python function in a throwaway virtualenv
#[derive(Parser, Debug)]
#[command(name = "venvcall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build an environment, call the function, print its result as JSON
    Run {
        /// Python file containing the function definition
        #[arg(value_name = "SOURCE_FILE")]
        source_file: String,

        /// Function to call (default: first top-level def)
        #[arg(long, short = 'f', value_name = "NAME")]
        function: Option<String>,

        #[command(flatten)]
        env: EnvArgs,

        #[command(flatten)]
        args: CallArgs,
    },

    /// Print the program that would run inside the environment
    Render {
        /// Python file containing the function definition
        #[arg(value_name = "SOURCE_FILE")]
        source_file: String,

        /// Function to call (default: first top-level def)
        #[arg(long, short = 'f', value_name = "NAME")]
        function: Option<String>,

        /// Render for the dill codec
        #[arg(long, default_value = "false")]
        use_dill: bool,

        /// Render as if arguments were passed
        #[arg(long, default_value = "false")]
        with_args: bool,
    },
}

/// Shape of the environment.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// pip requirement, repeatable
    #[arg(long = "requirement", short = 'r', value_name = "REQ")]
    pub requirements: Vec<String>,

    /// Interpreter version for the environment, e.g. 3.11
    #[arg(long, value_name = "VERSION")]
    pub python_version: Option<String>,

    /// Do not expose globally installed packages to the environment
    #[arg(long, default_value = "false")]
    pub no_system_site_packages: bool,

    /// Serialize with dill instead of pickle
    #[arg(long, default_value = "false")]
    pub use_dill: bool,

    /// Environment builder binary
    #[arg(long, env = "VENVCALL_VIRTUALENV", value_name = "BIN")]
    pub virtualenv: Option<String>,
}

/// Values passed to the function.
#[derive(Args, Debug, Clone, Default)]
pub struct CallArgs {
    /// Positional argument as JSON, repeatable
    #[arg(long = "arg", value_name = "JSON")]
    pub positional: Vec<String>,

    /// Keyword argument as KEY=JSON, repeatable
    #[arg(long = "kwarg", value_name = "KEY=JSON")]
    pub keyword: Vec<String>,

    /// Plain string exposed as `virtualenv_string_args`, repeatable
    #[arg(long = "string-arg", value_name = "S")]
    pub string_args: Vec<String>,

    /// JSON object merged into kwargs as `templates_dict`
    #[arg(long, value_name = "JSON")]
    pub templates_dict: Option<String>,
}
