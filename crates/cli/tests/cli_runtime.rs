use clap::CommandFactory;

use specwatch_cli::Cli;

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

#[test]
fn query_subcommand_parses_with_config_flag() {
    let parsed = <Cli as clap::Parser>::try_parse_from([
        "specwatch",
        "--config",
        "specwatch.toml",
        "query",
        "list my rules",
    ]);
    assert!(parsed.is_ok());
}

#[test]
fn missing_subcommand_is_rejected() {
    let parsed = <Cli as clap::Parser>::try_parse_from(["specwatch"]);
    assert!(parsed.is_err());
}
