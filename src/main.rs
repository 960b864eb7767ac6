use rust_media_scraper::aggregator::{Aggregator, QualifiedSlug};
use rust_media_scraper::config::Config;
use serde::Serialize;
use serde_json::Value;

const USAGE: &str = "usage: rust_media_scraper <command> [args]

  sources
  latest <source> [page]
  search <source> <query> [page]
  search-all <query> [page]
  detail <source:slug>
  units <source:slug>
  stream <source:unit-slug>
  schedule <source>
  genres <source>
  genre <source> <genre> [page]
  metrics";

fn to_json<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn required<'a>(args: &'a [String], index: usize, name: &str) -> Result<&'a str, String> {
    args.get(index)
        .map(String::as_str)
        .ok_or_else(|| format!("missing <{}>", name))
}

fn page(args: &[String], index: usize) -> Result<u32, String> {
    match args.get(index) {
        Some(p) => p.parse().map_err(|_| format!("invalid page {:?}", p)),
        None => Ok(1),
    }
}

fn qualified(args: &[String], index: usize) -> Result<QualifiedSlug, String> {
    required(args, index, "source:slug")?
        .parse::<QualifiedSlug>()
        .map_err(|e| e.to_string())
}

async fn run(agg: &Aggregator, args: &[String]) -> Result<Value, String> {
    match required(args, 0, "command")? {
        "sources" => to_json(agg.sources()),
        "latest" => to_json(agg.list_latest(required(args, 1, "source")?, page(args, 2)?).await),
        "search" => to_json(
            agg.search(required(args, 1, "source")?, required(args, 2, "query")?, page(args, 3)?)
                .await,
        ),
        "search-all" => to_json(agg.search_all(required(args, 1, "query")?, page(args, 2)?).await),
        "detail" => to_json(agg.get_detail_qualified(&qualified(args, 1)?).await),
        "units" => {
            let id = qualified(args, 1)?;
            to_json(agg.get_units(&id.source, &id.slug).await)
        }
        "stream" => to_json(agg.get_stream_qualified(&qualified(args, 1)?).await),
        "schedule" => to_json(agg.get_schedule(required(args, 1, "source")?).await),
        "genres" => to_json(agg.list_genres(required(args, 1, "source")?).await),
        "genre" => to_json(
            agg.list_by_genre(
                required(args, 1, "source")?,
                required(args, 2, "genre")?,
                page(args, 3)?,
            )
            .await,
        ),
        "metrics" => to_json(agg.metrics().get_all_metrics()),
        other => Err(format!("unknown command {:?}", other)),
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = log4rs::init_file("log4rs.yml", Default::default()) {
        eprintln!("logging disabled, could not load log4rs.yml: {}", e);
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", USAGE);
        return;
    }

    let config = Config::load();
    let aggregator = Aggregator::from_config(&config).await;
    match run(&aggregator, &args).await {
        Ok(value) => match serde_json::to_string_pretty(&value) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                log::error!("Could not encode result: {}", e);
                std::process::exit(1);
            }
        },
        Err(message) => {
            eprintln!("{}\n\n{}", message, USAGE);
            std::process::exit(2);
        }
    }
}
