//! Where attendd keeps its socket, database and config
//!
//! Everything resolves under the XDG base directories of the user running
//! the service, so no root is needed:
//!
//! | What | XDG location | Without XDG |
//! |---|---|---|
//! | socket | `$XDG_RUNTIME_DIR/attendd/attendd.sock` | `/tmp/attendd-$USER/attendd.sock` |
//! | data | `$XDG_DATA_HOME/attendd` | `~/.local/share/attendd`, else `/var/lib/attendd` |
//! | config | `$XDG_CONFIG_HOME/attendd/config.toml` | `~/.config/attendd/config.toml`, else `/etc/attendd/config.toml` |
//!
//! `ATTEND_SOCKET` overrides the socket for clients. The daemon takes its
//! overrides through command-line flags instead.

use std::path::{Path, PathBuf};

/// Environment variable clients use to find the daemon
pub const ATTEND_SOCKET_ENV: &str = "ATTEND_SOCKET";

/// Attendance database inside the data directory
pub const DATABASE_FILENAME: &str = "attendd.db";

const APP_DIR: &str = "attendd";
const SOCKET_FILENAME: &str = "attendd.sock";
const CONFIG_FILENAME: &str = "config.toml";

/// Environment lookup; empty values count as unset
type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

/// `$<xdg_var>/attendd`, or `$HOME/<home_relative>/attendd`
fn app_dir(env: Env<'_>, xdg_var: &str, home_relative: &str) -> Option<PathBuf> {
    env(xdg_var)
        .map(PathBuf::from)
        .or_else(|| env("HOME").map(|home| Path::new(&home).join(home_relative)))
        .map(|base| base.join(APP_DIR))
}

fn socket_path_in(env: Env<'_>) -> PathBuf {
    match env("XDG_RUNTIME_DIR") {
        Some(runtime) => Path::new(&runtime).join(APP_DIR).join(SOCKET_FILENAME),
        None => {
            let user = env("USER").unwrap_or_else(|| "unknown".into());
            PathBuf::from(format!("/tmp/{}-{}", APP_DIR, user)).join(SOCKET_FILENAME)
        }
    }
}

fn data_dir_in(env: Env<'_>) -> PathBuf {
    app_dir(env, "XDG_DATA_HOME", ".local/share")
        .unwrap_or_else(|| Path::new("/var/lib").join(APP_DIR))
}

fn config_path_in(env: Env<'_>) -> PathBuf {
    app_dir(env, "XDG_CONFIG_HOME", ".config")
        .unwrap_or_else(|| Path::new("/etc").join(APP_DIR))
        .join(CONFIG_FILENAME)
}

/// Socket a client should connect to. Honors `ATTEND_SOCKET`.
pub fn default_socket_path() -> PathBuf {
    process_env(ATTEND_SOCKET_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(system_socket_path)
}

/// Socket the daemon listens on when the config names none
pub fn system_socket_path() -> PathBuf {
    socket_path_in(&process_env)
}

/// Data directory the daemon uses when the config names none
pub fn system_data_dir() -> PathBuf {
    data_dir_in(&process_env)
}

pub fn default_config_path() -> PathBuf {
    config_path_in(&process_env)
}

/// The attendance database for a data directory
pub fn database_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DATABASE_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| vars.get(k).cloned()
    }

    #[test]
    fn xdg_directories_win() {
        let env = env_of(&[
            ("XDG_RUNTIME_DIR", "/run/user/1000"),
            ("XDG_DATA_HOME", "/data"),
            ("XDG_CONFIG_HOME", "/cfg"),
            ("HOME", "/home/alice"),
        ]);

        assert_eq!(
            socket_path_in(&env),
            PathBuf::from("/run/user/1000/attendd/attendd.sock")
        );
        assert_eq!(data_dir_in(&env), PathBuf::from("/data/attendd"));
        assert_eq!(
            config_path_in(&env),
            PathBuf::from("/cfg/attendd/config.toml")
        );
    }

    #[test]
    fn home_fallbacks() {
        let env = env_of(&[("HOME", "/home/alice"), ("USER", "alice")]);

        assert_eq!(
            socket_path_in(&env),
            PathBuf::from("/tmp/attendd-alice/attendd.sock")
        );
        assert_eq!(
            data_dir_in(&env),
            PathBuf::from("/home/alice/.local/share/attendd")
        );
        assert_eq!(
            config_path_in(&env),
            PathBuf::from("/home/alice/.config/attendd/config.toml")
        );
    }

    #[test]
    fn system_fallbacks_without_home() {
        let env = env_of(&[]);

        assert_eq!(
            socket_path_in(&env),
            PathBuf::from("/tmp/attendd-unknown/attendd.sock")
        );
        assert_eq!(data_dir_in(&env), PathBuf::from("/var/lib/attendd"));
        assert_eq!(
            config_path_in(&env),
            PathBuf::from("/etc/attendd/config.toml")
        );
    }

    #[test]
    fn database_lives_in_data_dir() {
        assert_eq!(
            database_path(Path::new("/var/lib/attendd")),
            PathBuf::from("/var/lib/attendd/attendd.db")
        );
    }
}
