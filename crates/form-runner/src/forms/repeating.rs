use chrono::Utc;
use tracing::debug;

use super::answers::{AnswerScope, Answers};
use super::domain::{AddAnotherGroup, Application, ExtraData, Form, Page, PageType};
use super::error::{ConfigurationError, FormError, RepeatingSectionError};

/// Adds and removes instances of an `add_another` page group.
///
/// Instances are stored densely: after any mutation the items are indexed
/// `0..count` with no gaps.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepeatingSectionController;

impl RepeatingSectionController {
    /// Appends `number_of_items` empty instances and returns the new count.
    pub fn add_another(
        &self,
        application: &mut Application,
        page_id: &str,
        number_of_items: usize,
    ) -> Result<usize, FormError> {
        let (hub, group) = hub_page(&application.form, page_id)?;
        if number_of_items == 0 {
            return Err(RepeatingSectionError::InvalidItemCount {
                page_id: hub.id.clone(),
            }
            .into());
        }

        let current = application.answers.item_count(&hub.id);
        if let Some(max_items) = group.max_items {
            if current + number_of_items > max_items {
                return Err(RepeatingSectionError::MaxItemsReached {
                    page_id: hub.id.clone(),
                    max_items,
                }
                .into());
            }
        }

        let count = application
            .answers
            .push_items(&hub.id, group.key_for(&hub.id), number_of_items);
        application.updated_at = Utc::now();
        debug!(page_id = %hub.id, count, "added repeating items");
        Ok(count)
    }

    /// Removes the instance at `item_index`, shifting later instances down.
    pub fn remove_from_add_another(
        &self,
        application: &mut Application,
        page_id: &str,
        item_index: usize,
    ) -> Result<usize, FormError> {
        let (hub, group) = hub_page(&application.form, page_id)?;
        let current = application.answers.item_count(&hub.id);
        if item_index >= current {
            return Err(RepeatingSectionError::ItemIndexOutOfRange {
                page_id: hub.id.clone(),
                index: item_index,
                count: current,
            }
            .into());
        }

        let count = application
            .answers
            .remove_item(&hub.id, group.key_for(&hub.id), item_index);
        application.updated_at = Utc::now();
        debug!(page_id = %hub.id, item_index, count, "removed repeating item");
        Ok(count)
    }
}

fn hub_page<'f>(
    form: &'f Form,
    page_id: &str,
) -> Result<(&'f Page, &'f AddAnotherGroup), FormError> {
    let page = form
        .page(page_id)
        .ok_or_else(|| FormError::page_not_found(&form.id, page_id))?;
    if page.page_type != PageType::AddAnother {
        return Err(RepeatingSectionError::NotAGroup {
            page_id: page.id.clone(),
        }
        .into());
    }
    let group = page.group.as_ref().ok_or_else(|| {
        FormError::configuration(
            &form.id,
            ConfigurationError::MissingGroup {
                page_id: page.id.clone(),
            },
        )
    })?;
    Ok((page, group))
}

/// Answer scope for a page: group members write into the selected item.
pub(crate) fn scope_for<'f>(
    form: &'f Form,
    answers: &Answers,
    page_id: &str,
    extra_data: Option<ExtraData>,
) -> Result<AnswerScope<'f>, FormError> {
    let Some((hub, group)) = form.group_of(page_id) else {
        return Ok(AnswerScope::Root);
    };
    let Some(extra_data) = extra_data else {
        return Err(RepeatingSectionError::MissingItemIndex {
            page_id: page_id.to_string(),
        }
        .into());
    };
    let count = answers.item_count(&hub.id);
    if extra_data.item_index >= count {
        return Err(RepeatingSectionError::ItemIndexOutOfRange {
            page_id: hub.id.clone(),
            index: extra_data.item_index,
            count,
        }
        .into());
    }
    Ok(AnswerScope::Item {
        key: group.key_for(&hub.id),
        index: extra_data.item_index,
    })
}
