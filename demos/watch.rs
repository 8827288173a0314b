//! Watch a game server or the master list
//!
//! Run with: cargo run --example watch [ADDR | master [MASTER_ADDR]]
//!
//! Examples:
//!   cargo run --example watch 144.76.176.131:28785   # one server, with teams and players
//!   cargo run --example watch master                  # populated servers of the public list
//!   cargo run --example watch master 127.0.0.1:28787  # list of a custom master server
//!
//! Every published JSON snapshot is printed on its own line. Two subscribers
//! share the topic to show that the poller runs once per topic.

use std::sync::Arc;

use extinfo_relay::broker::Broker;
use extinfo_relay::pinger::{Pinger, PingerConfig};
use extinfo_relay::poller::{
    MasterListPoller, MasterPollerConfig, ServerPoller, ServerPollerConfig, MASTER_TOPIC,
};

fn print_usage() {
    println!("Usage: watch [ADDR | master [MASTER_ADDR]]");
    println!();
    println!("  ADDR         host:port of a game server");
    println!("  master       watch the master server list instead");
    println!("  MASTER_ADDR  host:port of the master server (default sauerbraten.org:28787)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.is_empty() || args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("extinfo_relay=debug".parse()?)
                .add_directive("watch=debug".parse()?),
        )
        .init();

    let broker = Arc::new(Broker::new());
    let pinger = Arc::new(Pinger::bind(PingerConfig::default()).await?);

    let (topic, (mut updates, subscription)) = if args[0] == "master" {
        let config = match args.get(1) {
            Some(addr) => MasterPollerConfig::with_master(addr.clone()),
            None => MasterPollerConfig::default(),
        };
        let subscribed = broker
            .subscribe(MASTER_TOPIC, |publisher| {
                MasterListPoller::start(publisher, broker.clone(), pinger.clone(), config)
            })
            .await?;
        (MASTER_TOPIC.to_string(), subscribed)
    } else {
        let addr = args[0].clone();
        let subscribed = broker
            .subscribe(&addr, |publisher| {
                ServerPoller::start(publisher, pinger.clone(), ServerPollerConfig::new(addr.clone()))
            })
            .await?;
        (addr, subscribed)
    };

    // second subscriber, reusing the running poller
    let (mut mirror, mirror_subscription) = broker
        .subscribe(&topic, |_| Err(extinfo_relay::Error::Config("poller already running".into())))
        .await?;
    tokio::spawn(async move {
        let mut received = 0u64;
        while mirror.recv().await.is_some() {
            received += 1;
        }
        tracing::info!(received, "Mirror subscription ended");
    });

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Some(update) => println!("{}", String::from_utf8_lossy(&update)),
                None => {
                    println!("Topic {} closed", topic);
                    break;
                }
            },
            _ = tokio::signal::ctrl_c() => {
                println!("\nShutting down...");
                break;
            }
        }
    }

    broker.unsubscribe(&mirror_subscription).await.ok();
    broker.unsubscribe(&subscription).await.ok();

    let stats = broker.stats().await;
    println!("Broker: {} topics, {} subscribers", stats.topics, stats.subscribers);

    Ok(())
}
