pub mod cron_routes;
