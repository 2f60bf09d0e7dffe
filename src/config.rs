use clap::Parser;

use crate::domain::match_state::MatchConfig;

/// Command-line configuration for the arena server, grounded on the clap
/// derive pattern the broader example pack uses for its server binaries.
#[derive(Parser, Debug)]
#[command(name = "arena-server")]
#[command(about = "Authoritative server for a real-time multiplayer arena shooter")]
pub struct ServerConfig {
    #[arg(short, long, default_value = "0.0.0.0")]
    pub bind: String,

    #[arg(short, long, default_value_t = 9001)]
    pub port: u16,

    /// Shrinks the kill target and time limit so integration tests don't
    /// have to play out a full 20-kill, 7-minute match.
    #[arg(long)]
    pub test_mode: bool,

    #[arg(long, default_value_t = 30)]
    pub shutdown_drain_secs: u64,
}

impl ServerConfig {
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    pub fn match_config(&self) -> MatchConfig {
        if self.test_mode {
            MatchConfig::TEST_MODE
        } else {
            MatchConfig::DEFAULT
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        ServerConfig::command().debug_assert();
    }

    #[test]
    fn test_mode_selects_shrunk_match_config() {
        let config = ServerConfig {
            bind: "0.0.0.0".into(),
            port: 9001,
            test_mode: true,
            shutdown_drain_secs: 30,
        };
        assert_eq!(config.match_config().kill_target, MatchConfig::TEST_MODE.kill_target);
    }
}
