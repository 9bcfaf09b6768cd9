use clap::Parser;

/// Builds the JSON data files of the distribution charts from survey and
/// national accounts tables.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The JSON file describing the input tables and the visualizations to build.
    /// Relative paths inside it are resolved against its own directory.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (directory, optional) Where to write the JSON files. Setting this option overrides the
    /// output directory that may be specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (directory, optional) A directory holding reference JSON files with the same names as the
    /// outputs. If provided, distviz checks that every produced file matches its reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
