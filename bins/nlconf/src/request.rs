//! Requests against the configuration tree, from the command line or a
//! batch file.

use anyhow::{Context, bail};
use nlconf::{Agent, Backend, GroupId, Host};
use serde::Serialize;

/// One verb applied to one OID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get { oid: String },
    Set { oid: String, value: String },
    Add { oid: String, value: String },
    Del { oid: String },
    List { oid: String },
    Commit { oid: String },
}

/// Result of a successful request.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub oid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instances: Option<Vec<String>>,
}

impl Reply {
    fn done(oid: &str) -> Self {
        Self {
            oid: oid.to_owned(),
            value: None,
            instances: None,
        }
    }

    pub fn print(&self, json: bool) -> anyhow::Result<()> {
        if json {
            println!("{}", serde_json::to_string(self)?);
        } else if let Some(value) = &self.value {
            println!("{}", value);
        } else if let Some(instances) = &self.instances {
            println!("{}", instances.join(" "));
        }
        Ok(())
    }
}

impl Request {
    /// Parse a batch line `VERB OID [VALUE]`.
    ///
    /// The value is the rest of the line after the OID and may contain
    /// spaces. Blank lines and `#` comments yield `None`.
    pub fn parse_line(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }

        let (verb, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim_start();
        let (oid, value) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        if oid.is_empty() {
            bail!("missing OID in {:?}", line);
        }
        let oid = oid.to_owned();
        let value = value.trim_start().to_owned();

        let request = match verb {
            "get" => Self::Get { oid },
            "set" => Self::Set { oid, value },
            "add" => Self::Add { oid, value },
            "del" => Self::Del { oid },
            "list" => Self::List { oid },
            "commit" => Self::Commit { oid },
            other => bail!("unknown verb {:?}", other),
        };
        Ok(Some(request))
    }

    pub async fn execute<B: Backend, H: Host>(
        &self,
        agent: &mut Agent<B, H>,
        group: GroupId,
    ) -> nlconf::Result<Reply> {
        match self {
            Self::Get { oid } => {
                let value = agent.get(group, oid).await?;
                Ok(Reply {
                    value: Some(value),
                    ..Reply::done(oid)
                })
            }
            Self::Set { oid, value } => {
                agent.set(group, oid, value).await?;
                Ok(Reply::done(oid))
            }
            Self::Add { oid, value } => {
                agent.add(group, oid, value).await?;
                Ok(Reply::done(oid))
            }
            Self::Del { oid } => {
                agent.del(group, oid).await?;
                Ok(Reply::done(oid))
            }
            Self::List { oid } => {
                let names = agent.list(group, oid).await?;
                Ok(Reply {
                    instances: Some(names.split_whitespace().map(str::to_owned).collect()),
                    ..Reply::done(oid)
                })
            }
            Self::Commit { oid } => {
                agent.commit(group, oid).await?;
                Ok(Reply::done(oid))
            }
        }
    }
}

/// Parse every request of a batch document.
pub fn parse_batch(text: &str) -> anyhow::Result<Vec<Request>> {
    let mut requests = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let request = Request::parse_line(line).with_context(|| format!("line {}", n + 1))?;
        requests.extend(request);
    }
    Ok(requests)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(
            Request::parse_line("set /agent:Agt_A/env:GREETING hello world").unwrap(),
            Some(Request::Set {
                oid: "/agent:Agt_A/env:GREETING".into(),
                value: "hello world".into(),
            })
        );
        assert_eq!(
            Request::parse_line("  commit   /agent:Agt_A/route:10.1.0.0|16,dev=eth0 ").unwrap(),
            Some(Request::Commit {
                oid: "/agent:Agt_A/route:10.1.0.0|16,dev=eth0".into(),
            })
        );
        assert_eq!(
            Request::parse_line("add /agent:Agt_A/route:10.1.0.0|16,dev=eth0").unwrap(),
            Some(Request::Add {
                oid: "/agent:Agt_A/route:10.1.0.0|16,dev=eth0".into(),
                value: String::new(),
            })
        );
    }

    #[test]
    fn test_parse_line_skips_blank_and_comments() {
        assert_eq!(Request::parse_line("").unwrap(), None);
        assert_eq!(Request::parse_line("   # note").unwrap(), None);
    }

    #[test]
    fn test_parse_line_errors() {
        assert!(Request::parse_line("get").is_err());
        assert!(Request::parse_line("frob /agent:Agt_A/env:X").is_err());
    }

    #[test]
    fn test_parse_batch_reports_line() {
        let err = parse_batch("get /agent:Agt_A/dns:\nfrob x\n").unwrap_err();
        assert_eq!(err.to_string(), "line 2");
        assert_eq!(parse_batch("# only\n\nlist /agent:Agt_A/env:\n").unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_batch_commits_staged_route() {
        use nlconf::{AgentConfig, MemoryBackend, MemoryHost};

        let mut agent =
            Agent::new(AgentConfig::default(), MemoryBackend::new(), MemoryHost::new()).unwrap();
        let batch = "add /agent:Agt_A/route:10.1.0.0|16,dev=eth0\n\
                     set /agent:Agt_A/route:10.1.0.0|16,dev=eth0/metric: 4\n\
                     commit /agent:Agt_A/route:10.1.0.0|16,dev=eth0\n\
                     get /agent:Agt_A/route:10.1.0.0|16,dev=eth0/metric:\n";
        let mut last = None;
        for request in parse_batch(batch).unwrap() {
            last = Some(request.execute(&mut agent, 1).await.unwrap());
        }
        assert_eq!(last.unwrap().value.as_deref(), Some("4"));
    }
}
