use anyhow::Result;

use crate::config::Config;

/// One line of `docsync clients`.
#[derive(Debug, PartialEq, Eq)]
pub struct ClientStatus {
    pub id: String,
    pub chatbot_id: String,
    pub project_id: String,
    pub api_key_env: String,
    pub api_key_set: bool,
    pub jobs: usize,
}

pub fn client_statuses<F>(config: &Config, env_is_set: F) -> Vec<ClientStatus>
where
    F: Fn(&str) -> bool,
{
    config
        .clients
        .iter()
        .map(|(id, c)| ClientStatus {
            id: id.clone(),
            chatbot_id: c.chatbot_id.clone(),
            project_id: c.project_id.clone(),
            api_key_env: c.api_key_env.clone(),
            api_key_set: env_is_set(&c.api_key_env),
            jobs: config.jobs.values().filter(|j| j.client() == id).count(),
        })
        .collect()
}

pub fn list_clients(config: &Config) -> Result<()> {
    let statuses = client_statuses(config, |var| std::env::var(var).is_ok());
    if statuses.is_empty() {
        println!("No clients configured.");
        return Ok(());
    }

    println!(
        "{:<16} {:<24} {:<24} {:<24} JOBS",
        "CLIENT", "CHATBOT", "PROJECT", "API KEY"
    );
    for s in &statuses {
        let key = if s.api_key_set {
            format!("{} (set)", s.api_key_env)
        } else {
            format!("{} (MISSING)", s.api_key_env)
        };
        println!(
            "{:<16} {:<24} {:<24} {:<24} {}",
            s.id, s.chatbot_id, s.project_id, key, s.jobs
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_statuses() {
        let config: Config = toml::from_str(
            r#"
[db]
path = "x.sqlite"

[clients.vgk]
chatbot_id = "bot-1"
project_id = "prj-1"

[clients.lol]
chatbot_id = "bot-2"
project_id = "prj-2"
api_key_env = "LOL_TEC_KEY"

[jobs.worlds]
kind = "schedule"
client = "lol"
league_id = "1"
"#,
        )
        .unwrap();

        let statuses = client_statuses(&config, |var| var == "LOL_TEC_KEY");
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].id, "lol");
        assert!(statuses[0].api_key_set);
        assert_eq!(statuses[0].jobs, 1);
        assert_eq!(statuses[1].id, "vgk");
        assert!(!statuses[1].api_key_set);
        assert_eq!(statuses[1].jobs, 0);
    }
}
