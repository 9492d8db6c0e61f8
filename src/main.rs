use clap::{Parser, Subcommand};
use iced::widget::{button, column, container, row, scrollable, text};
use iced::{window, Alignment, Element, Length, Size, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod bundle;
mod list;
mod loader;
mod state;
mod ui;

use list::{ListLayout, VirtualScrollController};
use loader::{ImageLoadCoordinator, LoadOutcome};
use state::catalog::ImageCatalog;
use state::settings::Settings;

/// Height of the toolbar above the list
const HEADER_HEIGHT: f32 = 64.0;

#[derive(Parser, Debug)]
#[command(name = "lazy-gallery", version, about = "Scrollable image list with lazy loading")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Directory to scan for images
    #[arg(long, global = true)]
    images: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prepare the Images folder inside a build output directory
    Bundle {
        /// Build output directory
        #[arg(long)]
        build_dir: PathBuf,

        /// Copy the images tree into the bundle
        #[arg(long, conflicts_with = "no_copy_images")]
        copy_images: bool,

        /// Only create an empty Images folder
        #[arg(long)]
        no_copy_images: bool,
    },
}

/// Main application state
struct Gallery {
    /// The virtualized list and its loader
    list: VirtualScrollController,
    settings: Settings,
    /// Where the chosen folder is remembered, if anywhere
    settings_path: Option<PathBuf>,
    /// Status message to display to the user
    status: String,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// The list was scrolled or its bounds changed
    Scrolled(scrollable::Viewport),
    /// A new frame is about to be drawn
    Frame,
    /// The window was resized
    WindowResized(Size),
    /// A background decode finished
    ImageDecoded(LoadOutcome),
    /// User clicked "Reload"
    Reload,
    /// User clicked "Open Folder"
    OpenFolder,
}

impl Gallery {
    /// Scan the images folder and populate the list
    fn new(settings: Settings, settings_path: Option<PathBuf>) -> (Self, Task<Message>) {
        let catalog = ImageCatalog::scan(settings.images_dir.clone());
        let loader = ImageLoadCoordinator::new(catalog, settings.max_decode_size);
        let viewport_height = (settings.window_height - HEADER_HEIGHT).max(0.0);
        let layout = ListLayout::from_settings(&settings, viewport_height);
        let list = VirtualScrollController::new(layout, loader);

        info!("🖼️  Lazy Gallery initialized with {} images", list.total());

        let mut gallery = Gallery {
            list,
            settings,
            settings_path,
            status: String::new(),
        };
        gallery.refresh_status();
        let task = gallery.dispatch_loads();

        (gallery, task)
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Scrolled(viewport) => {
                self.list.relayout(viewport.bounds().height);
                self.list.scroll_to_relative(viewport.relative_offset().y);
                self.dispatch_loads()
            }
            Message::Frame => {
                self.list.tick();
                Task::none()
            }
            Message::WindowResized(size) => {
                self.list.relayout((size.height - HEADER_HEIGHT).max(0.0));
                self.dispatch_loads()
            }
            Message::ImageDecoded(outcome) => {
                self.list.complete(outcome);
                self.refresh_status();
                Task::none()
            }
            Message::Reload => {
                info!("🔄 Reloading {}", self.settings.images_dir.display());
                self.list.reset();
                self.refresh_status();
                Task::batch([self.snap_to_top(), self.dispatch_loads()])
            }
            Message::OpenFolder => {
                // Show the native folder picker dialog
                let folder = FileDialog::new()
                    .set_title("Select Folder with Images")
                    .set_directory(&self.settings.images_dir)
                    .pick_folder();

                let Some(folder) = folder else {
                    return Task::none();
                };

                info!("📂 Opening {}", folder.display());
                self.list.reset_with_root(folder.clone());
                self.settings.images_dir = folder;
                self.remember_settings();
                self.refresh_status();
                Task::batch([self.snap_to_top(), self.dispatch_loads()])
            }
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let toolbar = row![
            text("Lazy Gallery").size(24),
            text(&self.status).size(14).width(Length::Fill),
            button("Open Folder").on_press(Message::OpenFolder).padding(8),
            button("Reload").on_press(Message::Reload).padding(8),
        ]
        .spacing(16)
        .align_y(Alignment::Center);

        let header = container(toolbar)
            .height(Length::Fixed(HEADER_HEIGHT))
            .width(Length::Fill)
            .padding([0, 16])
            .center_y(Length::Fixed(HEADER_HEIGHT));

        let content: Element<Message> = if self.list.total() == 0 {
            container(text(format!(
                "No images found in {}",
                self.list.loader().catalog().root().display()
            )))
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
        } else {
            ui::rows::list_view(&self.list)
        };

        column![header, content].into()
    }

    /// Frames are only needed while some visible row is waiting for its image
    fn subscription(&self) -> Subscription<Message> {
        let resize = window::resize_events().map(|(_id, size)| Message::WindowResized(size));

        if self.list.needs_frames() {
            Subscription::batch([resize, window::frames().map(|_| Message::Frame)])
        } else {
            resize
        }
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }

    /// Run every load the list asked for in the background
    fn dispatch_loads(&mut self) -> Task<Message> {
        let requests = self.list.take_load_requests();
        if requests.is_empty() {
            return Task::none();
        }

        Task::batch(
            requests
                .into_iter()
                .map(|request| Task::perform(request.run(), Message::ImageDecoded)),
        )
    }

    fn snap_to_top(&self) -> Task<Message> {
        scrollable::snap_to(ui::rows::list_id(), scrollable::RelativeOffset::START)
    }

    fn refresh_status(&mut self) {
        let loading = self.list.loader().in_flight();
        self.status = if loading > 0 {
            format!("{} images, {} loading", self.list.total(), loading)
        } else {
            format!("{} images", self.list.total())
        };
    }

    /// Persist the settings so the chosen folder survives a restart
    fn remember_settings(&self) {
        let Some(path) = &self.settings_path else {
            return;
        };
        if let Err(e) = self.settings.save_to(path) {
            warn!("⚠️  Could not save settings: {}", e);
        }
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_bundle(
    settings: &Settings,
    build_dir: PathBuf,
    copy_images: bool,
    no_copy_images: bool,
) -> ExitCode {
    let copy = if copy_images {
        true
    } else if no_copy_images {
        false
    } else {
        settings.copy_images_on_bundle
    };

    match bundle::bundle_images(&settings.images_dir, &build_dir, copy) {
        Ok(report) => {
            info!(
                "✅ Bundled {} files into {}",
                report.copied_files,
                report.target.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("❌ Bundle failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_viewer(settings: Settings, settings_path: Option<PathBuf>) -> iced::Result {
    let window_size = Size::new(settings.window_width, settings.window_height);

    iced::application("Lazy Gallery", Gallery::update, Gallery::view)
        .subscription(Gallery::subscription)
        .theme(Gallery::theme)
        .window_size(window_size)
        .centered()
        .run_with(move || Gallery::new(settings, settings_path))
}

fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();
    let settings_path = match cli.settings {
        Some(path) => Some(path),
        None => Settings::default_path().ok(),
    };

    let mut settings = Settings::load_or_default(settings_path.as_deref());
    if let Some(images) = cli.images {
        settings.images_dir = images;
    }

    match cli.command {
        Some(Command::Bundle {
            build_dir,
            copy_images,
            no_copy_images,
        }) => run_bundle(&settings, build_dir, copy_images, no_copy_images),
        None => match run_viewer(settings, settings_path) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("❌ Viewer exited with an error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
