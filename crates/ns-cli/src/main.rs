fn main() {
    ns_cli::init_logging();
    let code = ns_cli::run_cli_from_args(std::env::args_os());
    std::process::exit(code);
}
