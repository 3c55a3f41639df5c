mod config;

use std::sync::Arc;

use catalog::rest::{RestAuth, RestClient, RestPointStore, RestSettingsStore};
use catalog::{MapPoint, PointKind, PointPatch, PointsService, SettingsService};
use clap::{Parser, Subcommand};
use foundation::{LngLat, PointId};
use mapstate::{AddPointForm, MapSync, MapSyncConfig};
use runtime::{EventBus, SessionContext, SignUpOutcome, UiEventKind};
use scene::{MapStyle, PopupContent, ViewState};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse and edit camp sites on the shared map")]
struct Args {
    /// Backend project URL (default: $CAMPSITES_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Public API key (default: $CAMPSITES_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List points, newest first
    List,

    /// Show one point as JSON
    Show { id: String },

    /// Add a point (requires CAMPSITES_EMAIL / CAMPSITES_PASSWORD)
    Add {
        #[arg(long)]
        name: String,

        /// campsite, rv_park, cabin, glamping, hiking_trail, viewpoint, or any tag
        #[arg(long, default_value = "campsite")]
        kind: String,

        /// Defaults to the map center; give both or neither
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        #[arg(long, default_value = "")]
        description: String,

        /// Comma-separated, e.g. "water, toilets, fire pits"
        #[arg(long, default_value = "")]
        amenities: String,

        /// 0-5
        #[arg(long)]
        rating: Option<f64>,
    },

    /// Change fields of an existing point
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        kind: Option<String>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        amenities: Option<String>,

        #[arg(long)]
        rating: Option<f64>,
    },

    /// Delete a point
    Delete { id: String },

    /// Show the signed-in user's map settings
    Settings,

    /// Store a default map view for the signed-in user
    SaveView {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, default_value_t = 8.0)]
        zoom: f64,
    },

    /// Store the preferred base style (outdoors, satellite, streets, light, dark)
    Style { name: String },

    /// Check credentials from CAMPSITES_EMAIL / CAMPSITES_PASSWORD
    SignIn,

    /// Register the CAMPSITES_EMAIL account
    SignUp,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = AppConfig::load(args.api_url, args.api_key)?;

    let events = EventBus::new();
    let session = SessionContext::new(Arc::new(RestAuth::new(config.rest.clone())), events.clone());
    let client = RestClient::new(config.rest.clone(), session.clone());
    let sync = MapSync::with_config(
        PointsService::new(Arc::new(RestPointStore::new(client.clone()))),
        SettingsService::new(Arc::new(RestSettingsStore::new(client)), session.clone()),
        session.clone(),
        MapSyncConfig {
            zoom_limits: config.zoom_limits,
            ..MapSyncConfig::default()
        },
    );

    if let Command::SignUp = args.command {
        let creds = config
            .credentials
            .ok_or("CAMPSITES_EMAIL and CAMPSITES_PASSWORD must be set")?;
        match session.sign_up(&creds.email, &creds.password).await? {
            SignUpOutcome::SignedIn(s) => println!("signed up as {}", s.user_id),
            SignUpOutcome::ConfirmationRequired => {
                println!("check {} for a confirmation link", creds.email)
            }
        }
        return Ok(());
    }

    session.restore().await?;
    if let Some(creds) = &config.credentials {
        let user = session.sign_in(&creds.email, &creds.password).await?;
        info!(%user, "signed in");
    }
    sync.bootstrap().await;

    let result = run(&sync, args.command).await;
    report_events(&events);
    sync.close();
    result
}

async fn run(sync: &MapSync, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Command::List => {
            let state = sync.snapshot();
            if let Some(err) = &state.points_error {
                return Err(format!("could not load points: {err}").into());
            }
            for point in &state.points {
                print_row(point);
            }
        }
        Command::Show { id } => {
            let id = PointId::new(id);
            if !sync.select_by_id(&id) {
                return Err(format!("no point with id {id}").into());
            }
            if let Some(popup) = sync.snapshot().popup() {
                print_popup(&popup);
            }
            if let Some(point) = sync.selected() {
                println!("{}", serde_json::to_string_pretty(&point)?);
            }
        }
        Command::Add {
            name,
            kind,
            lat,
            lon,
            description,
            amenities,
            rating,
        } => {
            let form = match (lat, lon) {
                (Some(lat), Some(lon)) => AddPointForm::at(LngLat::new(lon, lat)),
                (None, None) => sync.new_point_form(),
                _ => return Err("--lat and --lon must be given together".into()),
            };
            let form = AddPointForm {
                name,
                description,
                kind: PointKind::from_tag(&kind),
                amenities,
                rating,
                ..form
            };
            let point = sync.submit(&form).await?;
            print_row(&point);
        }
        Command::Update {
            id,
            name,
            kind,
            description,
            amenities,
            rating,
        } => {
            let mut patch = PointPatch::new();
            if let Some(name) = name {
                patch = patch.name(name);
            }
            if let Some(kind) = kind {
                patch = patch.kind(PointKind::from_tag(&kind));
            }
            if let Some(description) = description {
                let description = description.trim().to_string();
                patch = patch.description((!description.is_empty()).then_some(description));
            }
            if let Some(amenities) = amenities {
                let form = AddPointForm {
                    amenities,
                    ..AddPointForm::default()
                };
                patch = patch.amenities(form.amenity_list());
            }
            if let Some(rating) = rating {
                patch = patch.rating(Some(rating));
            }
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            let point = sync.update_point(&PointId::new(id), &patch).await?;
            print_row(&point);
        }
        Command::Delete { id } => {
            let id = PointId::new(id);
            sync.delete_point(&id).await?;
            println!("deleted {id}");
        }
        Command::Settings => {
            let state = sync.snapshot();
            match state.settings.persisted() {
                Some(row) => println!("{}", serde_json::to_string_pretty(row)?),
                None => println!(
                    "defaults ({:?}): view {}",
                    state.settings.fallback_reason(),
                    state.view
                ),
            }
            println!("style: {} ({})", state.style.label(), state.style.url());
        }
        Command::SaveView { lat, lon, zoom } => {
            sync.set_view_state(ViewState::new(lon, lat, zoom).clamped(sync.config().zoom_limits));
            let row = sync.save_view_as_default().await?;
            println!(
                "default view saved: {}",
                ViewState::new(row.default_longitude, row.default_latitude, row.default_zoom)
            );
        }
        Command::Style { name } => {
            let style: MapStyle = name.parse()?;
            sync.set_map_style(style).await?;
            println!("style saved: {}", style.label());
        }
        Command::SignIn => match sync.session().current() {
            Some(s) => println!("signed in as {} ({})", s.user_id, s.email.unwrap_or_default()),
            None => return Err("CAMPSITES_EMAIL and CAMPSITES_PASSWORD must be set".into()),
        },
        Command::SignUp => {}
    }
    Ok(())
}

fn print_row(point: &MapPoint) {
    let rating = point
        .rating
        .map(|r| format!("{r:.1}"))
        .unwrap_or_else(|| "-".to_string());
    println!(
        "{}\t{}\t{}\t{:.5},{:.5}\t{}",
        point.id,
        point.name,
        point.kind.label(),
        point.latitude,
        point.longitude,
        rating
    );
}

fn print_popup(popup: &PopupContent) {
    println!("{} [{}]", popup.title, popup.kind_label);
    if let Some(description) = &popup.description {
        println!("{description}");
    }
    if !popup.amenities.is_empty() {
        println!("amenities: {}", popup.amenities.join(", "));
    }
    if let Some(stars) = popup.stars() {
        let row: String = stars.iter().map(|s| if *s { '*' } else { '.' }).collect();
        println!("rating: {row}");
    }
}

fn report_events(events: &EventBus) {
    for event in events.drain() {
        match event.kind {
            UiEventKind::LoginRequested => warn!("login required: {}", event.message),
            UiEventKind::Notice(severity) => info!(?severity, "{}", event.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;

    use super::{Args, Command};

    #[test]
    fn add_rejects_half_a_coordinate() {
        let err = Args::try_parse_from(["campsites", "add", "--name", "x", "--lat", "40"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);

        let err = Args::try_parse_from(["campsites", "add", "--name", "x", "--lon", "-105"])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn add_accepts_both_or_neither_coordinate() {
        let args = Args::try_parse_from([
            "campsites", "add", "--name", "x", "--lat", "40", "--lon", "-105",
        ])
        .unwrap();
        match args.command {
            Command::Add { lat, lon, .. } => assert_eq!((lat, lon), (Some(40.0), Some(-105.0))),
            other => panic!("expected add, got {other:?}"),
        }

        let args = Args::try_parse_from(["campsites", "add", "--name", "x"]).unwrap();
        match args.command {
            Command::Add { lat, lon, .. } => assert_eq!((lat, lon), (None, None)),
            other => panic!("expected add, got {other:?}"),
        }
    }
}
