use std::path::PathBuf;

use structopt::StructOpt;
use web3::types::Address;

#[derive(StructOpt)]
#[structopt(about = "Approve options")]
pub struct ApproveOptions {
    #[structopt(short = "c", long = "chain-name", default_value = "bsc")]
    pub chain_name: String,

    #[structopt(
        short = "a",
        long = "amount",
        help = "Amount (decimal, full precision, i.e. 1000.50)"
    )]
    pub amount: String,

    #[structopt(long = "spender", help = "Spender address the allowance is granted to")]
    pub spender: Address,

    #[structopt(
        long = "start-chain",
        help = "Chain the wallet starts on, if different from the target the flow switches first"
    )]
    pub start_chain: Option<String>,
}

#[derive(StructOpt)]
#[structopt(about = "Allowance check options")]
pub struct AllowanceOptions {
    #[structopt(short = "c", long = "chain-name", default_value = "bsc")]
    pub chain_name: String,

    #[structopt(
        long = "owner",
        help = "Token owner (defaults to the address of ETH_PRIVATE_KEY)"
    )]
    pub owner: Option<Address>,

    #[structopt(long = "spender", help = "Spender address to check")]
    pub spender: Address,
}

#[derive(StructOpt)]
#[structopt(about = "Token decimals options")]
pub struct DecimalsOptions {
    #[structopt(short = "c", long = "chain-name", default_value = "bsc")]
    pub chain_name: String,
}

#[derive(StructOpt)]
#[structopt(about = "USDT approval tool")]
pub enum ApprovalCommands {
    #[structopt(about = "Submit an approval and wait for confirmation")]
    Approve {
        #[structopt(flatten)]
        approve_options: ApproveOptions,
    },
    #[structopt(about = "Read the current allowance")]
    Allowance {
        #[structopt(flatten)]
        allowance_options: AllowanceOptions,
    },
    #[structopt(about = "Read the token decimals")]
    Decimals {
        #[structopt(flatten)]
        decimals_options: DecimalsOptions,
    },
    #[structopt(about = "List configured chains")]
    Chains,
}

#[derive(StructOpt)]
#[structopt(about = "USDT approval tool")]
pub struct ApprovalOptions {
    #[structopt(
        long = "config",
        help = "Chain configuration file (built-in chains when not given)"
    )]
    pub config: Option<PathBuf>,

    #[structopt(subcommand)]
    pub commands: ApprovalCommands,
}
