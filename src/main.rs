use anyhow::Result;
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use std::io::{self, BufRead, Write};

mod blockchain;

use blockchain::{Chain, LedgerSnapshot, Miner};

/// Nonces longer than this are abandoned and the search reseeds.
const MAX_NONCE_LEN: usize = 8;

/// The administrator account funded by hand in the genesis block.
const GENESIS_ACCOUNT: &str = "Yumi";
const GENESIS_AMOUNT: i64 = i32::MAX as i64;

#[derive(Parser, Debug)]
#[command(about = "A proof-of-work ledger of account-balance transfers")]
struct Args {
    /// Number of leading zeros required in each block hash
    #[arg(default_value_t = 4)]
    difficulty: usize,
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Args::parse();
    info!("mining with difficulty {}", args.difficulty);

    let mut miner = Miner::new(args.difficulty, MAX_NONCE_LEN, StdRng::from_entropy());
    let mut chain = Chain::new("My Blockchain");
    info!("created chain {:?}", chain.name());

    println!("Creating genesis block...");
    let genesis = miner.mine_genesis(LedgerSnapshot::with_account(GENESIS_ACCOUNT, GENESIS_AMOUNT))?;
    chain.append(genesis)?;
    println!(
        "Genesis block successfully created for {} with {} coins.",
        GENESIS_ACCOUNT, GENESIS_AMOUNT
    );
    print_last_block(&chain);

    let stdin = io::stdin();
    let mut input = stdin.lock();

    loop {
        println!();
        println!("'new' to create a new block...");
        println!("'verify' to verify the blockchain...");
        print!("'quit' or 'exit' to exit... ");
        io::stdout().flush()?;

        let choice = match read_line(&mut input)? {
            Some(line) => line,
            None => break, // stdin closed
        };

        match choice.as_str() {
            "quit" | "exit" => {
                println!("Exiting...");
                break;
            }
            "verify" => match chain.verify() {
                Ok(()) => println!("Blockchain verified: {} blocks intact.", chain.len()),
                Err(err) => println!("{}", err),
            },
            "new" => {
                if handle_new_block(&mut chain, &mut miner, &mut input)?.is_none() {
                    break; // stdin closed mid-prompt
                }
            }
            _ => {}
        }
    }

    Ok(())
}

/// Collects payer, payee and amount, confirms, then mines and appends one
/// transfer block. Business rejections print a message and leave the chain
/// unchanged. Returns `None` only when stdin closes.
fn handle_new_block(
    chain: &mut Chain,
    miner: &mut Miner<StdRng>,
    input: &mut impl BufRead,
) -> Result<Option<()>> {
    let payer = match prompt(input, "Payer account : ")? {
        Some(line) => line,
        None => return Ok(None),
    };
    let payee = match prompt(input, "Payee account : ")? {
        Some(line) => line,
        None => return Ok(None),
    };
    let amount_text = match prompt(input, "Amount : ")? {
        Some(line) => line,
        None => return Ok(None),
    };

    let amount: i64 = match amount_text.parse() {
        Ok(value) => value,
        Err(_) => {
            println!("Inappropriate input for amount...");
            return Ok(Some(()));
        }
    };

    loop {
        let question = format!(
            "{} will pay {} {} coins... Continue? y/N... ",
            payer, payee, amount
        );
        match prompt(input, &question)? {
            Some(response) => match response.as_str() {
                "y" | "Y" => break,
                "n" | "N" => {
                    println!("Transaction cancelled by user...");
                    return Ok(Some(()));
                }
                _ => continue,
            },
            None => return Ok(None),
        }
    }

    let tip = chain.last()?.clone();
    match tip.ledger.apply_transfer(&payer, &payee, amount) {
        Ok(next_ledger) => {
            println!("Creating block number {}...", tip.index + 1);
            let block = miner.mine_next(&tip, next_ledger)?;
            chain.append(block)?;
            println!(
                "{} successfully paid {} {} coins! Transaction complete!",
                payer, payee, amount
            );
            print_last_block(chain);
        }
        Err(err) => {
            println!("{}! Transaction aborted!", err);
        }
    }

    Ok(Some(()))
}

fn print_last_block(chain: &Chain) {
    if let Ok(block) = chain.last() {
        println!("{}", block);
        println!("Balances        :");
        for (name, coins) in block.ledger.accounts() {
            println!("  {} : {}", name, coins);
        }
    }
}

/// Prints a prompt and reads one trimmed line; `None` on end of input.
fn prompt(input: &mut impl BufRead, label: &str) -> Result<Option<String>> {
    print!("{}", label);
    io::stdout().flush()?;
    read_line(input)
}

fn read_line(input: &mut impl BufRead) -> Result<Option<String>> {
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}
