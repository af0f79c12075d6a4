use std::sync::Arc;

use crate::{error, info, server, warning};

pub async fn serve() {
    let sorter = Arc::new(super::sorter());

    if sorter.settings().cron_secret.is_none() {
        warning!("CRON_SECRET is not set, protected endpoints will refuse every request");
    }
    info!("Listening on {}", sorter.settings().server_address);

    if let Err(e) = server::start_api_server(sorter).await {
        error!("Server stopped. Err: {}", e);
    }
}
