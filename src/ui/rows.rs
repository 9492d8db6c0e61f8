use chrono::Local;
use iced::widget::{column, container, row, scrollable, text, Column, Image, Space};
use iced::{Alignment, ContentFit, Element, Length};

use crate::list::{RowWidget, VirtualScrollController};
use crate::state::data::LoadState;
use crate::Message;

/// Widest image shown in a row, relative to the row height
const MAX_ASPECT: f32 = 3.0;

/// Id of the list scrollable, used to snap back to the top on reset
pub fn list_id() -> scrollable::Id {
    scrollable::Id::new("image-list")
}

/// Build the scrollable list.
///
/// Only the pool is turned into widgets. Everything above and below the
/// pool is a spacer, so the content keeps the height of the full catalog
/// and the scrollbar behaves as if every row existed.
pub fn list_view(list: &VirtualScrollController) -> Element<'_, Message> {
    let layout = list.layout();
    let stride = layout.stride();
    let window = list.window();

    let mut content = Column::new().width(Length::Fill);

    if window.start > 0 {
        content = content.push(Space::with_height(Length::Fixed(window.start as f32 * stride)));
    }

    for widget in list.rows_in_order() {
        // Rows far outside the viewport only hold their place
        let slot: Element<'_, Message> = if widget.is_active() {
            row_view(widget)
        } else {
            Space::with_height(Length::Fixed(widget.height())).into()
        };

        content = content.push(
            container(slot)
                .height(Length::Fixed(stride))
                .width(Length::Fill),
        );
    }

    let remaining = list.total().saturating_sub(window.end);
    if remaining > 0 {
        content = content.push(Space::with_height(Length::Fixed(remaining as f32 * stride)));
    }

    scrollable(content)
        .id(list_id())
        .on_scroll(Message::Scrolled)
        .width(Length::Fill)
        .height(Length::Fill)
        .into()
}

/// One row: picture (or placeholder) plus name and age
fn row_view(widget: &RowWidget) -> Element<'_, Message> {
    let height = widget.height();
    let picture: Element<'_, Message> = match widget.image() {
        Some(decoded) => {
            let aspect = widget.aspect_ratio().unwrap_or(1.0).min(MAX_ASPECT);
            Image::new(decoded.handle.clone())
                .width(Length::Fixed(height * aspect))
                .height(Length::Fixed(height))
                .content_fit(ContentFit::Contain)
                .into()
        }
        None => container(text(placeholder_label(widget.load_state())).size(14))
            .width(Length::Fixed(height))
            .height(Length::Fixed(height))
            .center_x(Length::Fixed(height))
            .center_y(Length::Fixed(height))
            .style(container::rounded_box)
            .into(),
    };

    let (name, age) = match widget.binding() {
        Some(binding) => (binding.name.clone(), binding.age_label(Local::now())),
        None => (String::new(), String::new()),
    };

    let details = column![text(name).size(18), text(age).size(14)].spacing(6);

    container(
        row![picture, details]
            .spacing(16)
            .align_y(Alignment::Center),
    )
    .height(Length::Fixed(height))
    .width(Length::Fill)
    .padding([0, 16])
    .into()
}

/// Text shown while a row has no picture
fn placeholder_label(state: LoadState) -> &'static str {
    match state {
        LoadState::NotStarted | LoadState::Loading => "Loading…",
        LoadState::Failed => "Unavailable",
        LoadState::Loaded => "",
    }
}
