use super::evaluation_time;
use app_utils::SecurityDatabase;
use colored::*;
use core_identity::SubjectId;
use core_policy::{Decision, FixedClock, Method, Permission};
use srm_engine::payload::strip_query;
use srm_engine::{
    AmsTransport, EngineConfig, OutboundRequest, PolicyEngine, Resolution, ResponseSink,
};
use tracing::debug;

/// Arguments of `srm eval`
pub struct EvalArgs<'a> {
    pub file: &'a str,
    pub subject: &'a str,
    pub resource: &'a str,
    pub method: &'a str,
    pub at: Option<&'a str>,
    pub config: Option<&'a str>,
}

/// Accepts delegation requests without sending them anywhere
struct OfflineTransport;

impl AmsTransport for OfflineTransport {
    fn send_discovery(&mut self, request: OutboundRequest) -> srm_engine::Result<()> {
        debug!(uri = %request.uri, "offline: discovery not sent");
        Ok(())
    }

    fn send_unicast(&mut self, request: OutboundRequest) -> srm_engine::Result<()> {
        debug!(uri = %request.uri, "offline: unicast not sent");
        Ok(())
    }
}

struct DiscardSink;

impl ResponseSink for DiscardSink {
    fn deliver(&mut self, resolution: Resolution) {
        debug!(decision = %resolution.decision, "offline: resolution discarded");
    }
}

pub fn run(args: &EvalArgs<'_>) -> anyhow::Result<()> {
    let db = SecurityDatabase::from_path(args.file)
        .map_err(|e| anyhow::anyhow!("Invalid security database: {}", e))?;
    let subject: SubjectId = args
        .subject
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid subject: {}", e))?;
    let method: Method = args
        .method
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid method: {}", e))?;
    let config = match args.config {
        Some(path) => EngineConfig::from_toml(&std::fs::read_to_string(path)?)?,
        None => EngineConfig::default(),
    };
    let now = evaluation_time(args.at)?;

    let mut engine = PolicyEngine::new(config, OfflineTransport, DiscardSink, FixedClock(now))?
        .with_acl(db.acl_store()?)
        .with_amacl(db.amacl_store()?)
        .with_owner(db.owner);
    engine.init()?;

    let resource = strip_query(args.resource);
    let permission = Permission::from_method(method);
    let decision = engine.check_permission(&subject, resource, permission);

    println!("{} {} {} {}", "Request:".bold(), subject, method, resource);
    println!("  Time:       {}", now.format("%Y-%m-%d %H:%M:%S"));
    println!("  Permission: {:#06x}", permission.bits());
    match decision {
        Decision::Granted => println!("{} {}", "✓".green().bold(), decision),
        Decision::WaitingForAms => {
            println!("{} {}", "…".yellow().bold(), decision);
            if let Some(ams) = engine.amacl().ams_device_for(resource) {
                println!("  Delegated to AMS {}", ams);
            }
        }
        Decision::Denied(_) => println!("{} {}", "✗".red().bold(), decision),
    }
    println!("  Wire value: {:#06x}", decision.to_wire());

    Ok(())
}
