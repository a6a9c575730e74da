mod options;

use crate::options::{ApprovalCommands, ApprovalOptions};
use std::env;
use structopt::StructOpt;
use web3::types::Address;

use usdt_approval_lib::config::Config;
use usdt_approval_lib::error::*;
use usdt_approval_lib::eth::{check_allowance, get_token_decimals};
use usdt_approval_lib::gateway::AllowanceSnapshot;
use usdt_approval_lib::lifecycle::{
    ApprovalPhase, ApprovalRequest, SessionEvent, SessionEventContent,
};
use usdt_approval_lib::runtime::connect_approval_session;
use usdt_approval_lib::setup::{ApprovalSetup, ChainSetup};
use usdt_approval_lib::wallet::load_private_key;
use usdt_approval_lib::{err_custom_create, err_from};

fn resolve_chain<'a>(setup: &'a ApprovalSetup, name: &str) -> Result<&'a ChainSetup, ApprovalError> {
    setup
        .find_chain_by_network(name)
        .ok_or(err_custom_create!("Chain {} not found in config", name))
}

async fn read_allowance_snapshot(
    chain: &ChainSetup,
    owner: Address,
    spender: Address,
) -> Result<AllowanceSnapshot, ApprovalError> {
    let decimals = get_token_decimals(&chain.provider, chain.token_address).await?;
    let raw_value = check_allowance(&chain.provider, owner, chain.token_address, spender).await?;
    Ok(AllowanceSnapshot { raw_value, decimals })
}

async fn main_internal() -> Result<(), ApprovalError> {
    dotenv::dotenv().ok();
    env::set_var(
        "RUST_LOG",
        env::var("RUST_LOG").unwrap_or("info,web3=warn".to_string()),
    );

    env_logger::init();
    let cli: ApprovalOptions = ApprovalOptions::from_args();

    let config = match &cli.config {
        Some(path) => Config::load(path.display().to_string()).await?,
        None => Config::load_default()?,
    };

    match cli.commands {
        ApprovalCommands::Chains => {
            let setup = ApprovalSetup::new(&config)?;
            for chain in setup.chain_setup.values() {
                println!(
                    "{} (chain id {}): {} at {:#x}, explorer: {}",
                    chain.chain_name,
                    chain.chain_id,
                    chain.token_symbol,
                    chain.token_address,
                    chain.block_explorer_url.as_deref().unwrap_or("-")
                );
            }
        }
        ApprovalCommands::Decimals { decimals_options } => {
            let setup = ApprovalSetup::new(&config)?;
            let chain = resolve_chain(&setup, &decimals_options.chain_name)?;
            let decimals = get_token_decimals(&chain.provider, chain.token_address).await?;
            println!(
                "{} on {} has {} decimals",
                chain.token_symbol, chain.chain_name, decimals
            );
        }
        ApprovalCommands::Allowance { allowance_options } => {
            let setup = ApprovalSetup::new(&config)?;
            let chain = resolve_chain(&setup, &allowance_options.chain_name)?;
            let owner = match allowance_options.owner {
                Some(owner) => owner,
                None => {
                    let key = env::var("ETH_PRIVATE_KEY")
                        .expect("Specify --owner or ETH_PRIVATE_KEY env variable");
                    load_private_key(&key).map_err(err_from!())?.1
                }
            };
            match read_allowance_snapshot(chain, owner, allowance_options.spender).await {
                Ok(snapshot) => println!(
                    "Allowance of {:#x} for spender {:#x} on {}: {} {}",
                    owner,
                    allowance_options.spender,
                    chain.chain_name,
                    snapshot.formatted(),
                    chain.token_symbol
                ),
                Err(err) => {
                    log::warn!("Allowance read failed, allowance unknown: {err}");
                    println!(
                        "Allowance of {:#x} for spender {:#x} on {}: 0 {}",
                        owner, allowance_options.spender, chain.chain_name, chain.token_symbol
                    );
                }
            }
        }
        ApprovalCommands::Approve { approve_options } => {
            let key =
                env::var("ETH_PRIVATE_KEY").expect("Specify ETH_PRIVATE_KEY env variable");
            let (secret_key, public_addr) = load_private_key(&key).map_err(err_from!())?;

            let target_chain = config
                .chain
                .get(&approve_options.chain_name)
                .ok_or(err_custom_create!(
                    "Chain {} not found in config",
                    approve_options.chain_name
                ))?;
            let target_chain_id = target_chain.chain_id;
            let token_symbol = target_chain.token.symbol.clone();
            let start_chain_id = match &approve_options.start_chain {
                Some(name) => {
                    config
                        .chain
                        .get(name)
                        .ok_or(err_custom_create!("Chain {} not found in config", name))?
                        .chain_id
                }
                None => target_chain_id,
            };

            let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<SessionEvent>(16);
            let printer = tokio::spawn(async move {
                while let Some(event) = event_rx.recv().await {
                    match event.content {
                        SessionEventContent::PhaseChanged(ApprovalPhase::Failed(reason)) => {
                            println!("phase: failed - {reason}")
                        }
                        SessionEventContent::PhaseChanged(phase) => {
                            println!("phase: {phase:?}")
                        }
                        SessionEventContent::ApprovalConfirmed {
                            tx_hash,
                            block_number,
                            ..
                        } => println!("approval confirmed in block {block_number}, tx {tx_hash}"),
                        SessionEventContent::AllowanceRefreshed(snapshot) => {
                            println!("allowance refreshed: {}", snapshot.formatted())
                        }
                    }
                }
            });

            let runtime =
                connect_approval_session(&config, secret_key, start_chain_id, Some(event_tx))?;
            println!("Connected as {public_addr:#x}");

            let request = ApprovalRequest::new(approve_options.amount.clone(), target_chain_id);
            let phase = runtime
                .flow
                .submit_approval(request, approve_options.spender)
                .await?;
            let allowance = runtime.flow.allowance().await;
            runtime.disconnect();
            printer
                .await
                .map_err(|e| err_custom_create!("Event printer task failed: {e}"))?;

            match phase {
                ApprovalPhase::Confirmed => {
                    let formatted = allowance
                        .map(|snapshot| snapshot.formatted())
                        .unwrap_or_else(|| "0".to_string());
                    println!("Approval confirmed, current allowance: {formatted} {token_symbol}");
                }
                ApprovalPhase::Failed(reason) => {
                    println!("Approval failed: {reason}");
                }
                _ => {}
            }
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ApprovalError> {
    match main_internal().await {
        Ok(_) => Ok(()),
        Err(e) => {
            eprintln!("Error: {e}");
            Err(e)
        }
    }
}
