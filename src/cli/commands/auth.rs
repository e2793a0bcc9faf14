use clap::{Arg, Command};

pub const ARG_TOKEN_SECRET: &str = "token-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";

pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_TOKEN_SECRET)
                .long("token-secret")
                .help("Secret used to sign access and refresh tokens")
                .env("KONTO_TOKEN_SECRET")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long("access-token-ttl-seconds")
                .help("Access token TTL in seconds")
                .env("KONTO_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("1800")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long("refresh-token-ttl-seconds")
                .help("Refresh token TTL in seconds")
                .env("KONTO_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("432000")
                .value_parser(clap::value_parser!(u64)),
        )
}
