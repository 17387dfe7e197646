use std::io::{Error, ErrorKind};
use std::sync::{Arc, Mutex};
use clap::Parser;
use log::{info, error};
use tokio::net::{TcpListener, TcpStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio_tungstenite::tungstenite::protocol::Message;
use tile_conquest::session::{handle_message, Game};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(long, default_value = "localhost")]
    host: String,
    #[arg(long, default_value_t = 999)]
    port: u16,
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let args = Args::parse();
    let level: log::Level = args.log_level.parse()
        .map_err(|_| Error::new(ErrorKind::InvalidInput, format!("Invalid log level: {}", args.log_level)))?;
    simple_logger::init_with_level(level)
        .map_err(|e| Error::new(ErrorKind::Other, e.to_string()))?;

    let address = format!("{}:{}", args.host, args.port);

    let listener = TcpListener::bind(address.clone()).await?;
    info!("Listening on: {}", address);

    while let Ok((stream, _)) = listener.accept().await {
        tokio::spawn(async move {
            if let Err(e) = accept_connection(stream).await {
                error!("Connection closed with error: {:?}", e);
            }
        });
    }

    Ok(())
}

async fn accept_connection(stream: TcpStream) -> Result<(), Error> {
    let addr = stream.peer_addr()?;
    info!("Peer address: {}", addr);

    let ws_stream = tokio_tungstenite::accept_async(stream)
        .await
        .map_err(|e| Error::new(ErrorKind::ConnectionAborted, e.to_string()))?;
    info!("New WebSocket connection: {}", addr);

    let (mut write, mut read) = ws_stream.split();

    let game_mutex = Arc::new(Mutex::new(Game::new()));

    while let Some(raw_message) = read.next().await {
        match raw_message {
            Ok(text_message) => {
                if !text_message.is_text() && !text_message.is_binary() { continue; }
                match serde_json::from_slice::<Value>(&text_message.into_data()) {
                    Ok(data) => {
                        info!("Received: {}", data);
                        let response = match run_blocking(&game_mutex, data).await {
                            Ok(resp) => resp,
                            Err(e) => {
                                error!("Error handling message: {:?}", e);
                                json!({"error": e.to_string()})
                            }
                        };
                        let response_str = response.to_string();
                        write.send(Message::text(response_str.clone())).await
                            .map_err(|e| Error::new(ErrorKind::BrokenPipe, e.to_string()))?;
                        info!("Sent: {}", response_str);
                    },
                    Err(e) => { error!("Error parsing JSON: {:?}", e); }
                }
            }
            Err(e) => { error!("Error reading websocket message: {:?}", e); }
        }
    }

    info!("Connection closed: {}", addr);
    Ok(())
}

// search is CPU bound, keep it off the reactor threads
async fn run_blocking(game_mutex: &Arc<Mutex<Game>>, data: Value) -> Result<Value, Error> {
    let game_mutex = Arc::clone(game_mutex);
    tokio::task::spawn_blocking(move || -> Result<Value, Error> {
        let mut game = game_mutex.lock()
            .map_err(|_| Error::new(ErrorKind::Other, "Game state poisoned"))?;
        Ok(handle_message(&mut game, data)?)
    })
    .await?
}
