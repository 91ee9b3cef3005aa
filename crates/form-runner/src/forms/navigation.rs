use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::condition::first_match;
use super::domain::{AddAnotherGroup, Application, ExtraData, Page, PageLocation, PageType};
use super::error::{ConfigurationError, FormError};
use super::handlers::HandlerRegistry;
use super::processor::PageProcessor;
use super::repeating::scope_for;

/// Where a fast-forward walk ended. `stop` means no further progress is possible
/// from `location` (terminal page, dead end, or a cycle).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalkOutcome {
    pub location: PageLocation,
    pub stop: bool,
}

/// Resolves transitions over the page graph of an application's form.
///
/// Back links are never stored: the previous page is recomputed by replaying the
/// graph from the start page with the current answers, so it always agrees with
/// the conditions as they evaluate now.
#[derive(Debug, Clone, Copy)]
pub struct NavigationResolver<'r> {
    registry: &'r HandlerRegistry,
}

impl<'r> NavigationResolver<'r> {
    pub fn new(registry: &'r HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Page that follows `page_id`, or `None` on summary and stop pages.
    ///
    /// An add-another page first loops into the lowest unfilled item of its group.
    pub fn next_page(
        &self,
        application: &Application,
        page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<Option<PageLocation>, FormError> {
        let page = page(application, page_id)?;
        self.transition(application, page, extra_data, true)
    }

    /// Page shown before `target_page_id` under the current answers.
    ///
    /// Returns `None` when the target is the start page, cannot be reached before a
    /// terminal page, or the replay revisits a page.
    pub fn previous_page(
        &self,
        application: &Application,
        target_page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<Option<PageLocation>, FormError> {
        let form = &application.form;
        page(application, target_page_id)?;

        if let Some((hub, group)) = form.group_of(target_page_id) {
            scope_for(form, &application.answers, target_page_id, extra_data)?;
            let first_id = group.pages.first().ok_or_else(|| {
                FormError::configuration(
                    &form.id,
                    ConfigurationError::MissingGroup {
                        page_id: hub.id.clone(),
                    },
                )
            })?;
            if first_id == target_page_id {
                return Ok(Some(PageLocation::of(hub, None)));
            }
            let first = page(application, first_id)?;
            let hops = group.pages.len();
            return self.replay(application, first, target_page_id, extra_data, hops);
        }

        let start = form.page(&form.start_page).ok_or_else(|| {
            FormError::configuration(
                &form.id,
                ConfigurationError::MissingStartPage {
                    start_page: form.start_page.clone(),
                },
            )
        })?;
        self.replay(application, start, target_page_id, None, form.pages.len())
    }

    /// Walks forward from `page_id` to the first page whose stored answers are
    /// missing or invalid, checking each page without changing the application.
    pub fn walk_to_next_invalid_or_unfilled_page(
        &self,
        application: &Application,
        page_id: &str,
        extra_data: Option<ExtraData>,
    ) -> Result<WalkOutcome, FormError> {
        let processor = PageProcessor::new(self.registry);
        let mut visited = HashSet::new();
        let mut location = PageLocation::of(page(application, page_id)?, extra_data);

        loop {
            let current = page(application, &location.page_id)?;
            let state = (current.id.clone(), location.extra_data.map(|extra| extra.item_index));
            if !visited.insert(state) {
                warn!(
                    form_id = %application.form.id,
                    page_id = %current.id,
                    "page graph cycles back on itself; stopping walk"
                );
                return Ok(WalkOutcome {
                    location,
                    stop: true,
                });
            }

            let errors = processor.check(application, &current.id, location.extra_data)?;
            if !errors.is_empty() {
                return Ok(WalkOutcome {
                    location,
                    stop: false,
                });
            }

            match self.transition(application, current, location.extra_data, true)? {
                Some(next) => location = next,
                None => {
                    return Ok(WalkOutcome {
                        location,
                        stop: true,
                    })
                }
            }
        }
    }

    /// Replays from `from` until `target_page_id`, returning the hop before it.
    /// Repeating groups are not entered, so add-another pages follow their exits.
    fn replay(
        &self,
        application: &Application,
        from: &Page,
        target_page_id: &str,
        extra_data: Option<ExtraData>,
        max_hops: usize,
    ) -> Result<Option<PageLocation>, FormError> {
        let form = &application.form;
        let within_group = form.group_of(&from.id).map(|(hub, _)| hub.id.as_str());
        let mut visited: HashSet<&str> = HashSet::new();
        let mut previous: Option<PageLocation> = None;
        let mut current = from;

        for _ in 0..=max_hops {
            if current.id == target_page_id {
                return Ok(previous);
            }
            if !visited.insert(current.id.as_str()) {
                warn!(
                    form_id = %form.id,
                    page_id = %current.id,
                    target = target_page_id,
                    "page graph cycles back on itself; no back link"
                );
                return Ok(None);
            }

            let Some(next) = self.transition(application, current, extra_data, false)? else {
                return Ok(None);
            };
            let next_group = form.group_of(&next.page_id).map(|(hub, _)| hub.id.as_str());
            if next_group != within_group {
                return Ok(None);
            }

            previous = Some(PageLocation::of(current, extra_data));
            current = page(application, &next.page_id)?;
        }

        warn!(
            form_id = %form.id,
            target = target_page_id,
            max_hops,
            "replay exceeded hop limit; no back link"
        );
        Ok(None)
    }

    /// Lowest item whose own path through the group stops on a page with missing
    /// or invalid answers. Member pages skipped by a condition are not required.
    fn first_unfilled_item(
        &self,
        application: &Application,
        hub: &Page,
        group: &AddAnotherGroup,
    ) -> Result<Option<usize>, FormError> {
        for index in 0..application.answers.item_count(&hub.id) {
            if !self.item_complete(application, hub, group, index)? {
                return Ok(Some(index));
            }
        }
        Ok(None)
    }

    fn item_complete(
        &self,
        application: &Application,
        hub: &Page,
        group: &AddAnotherGroup,
        index: usize,
    ) -> Result<bool, FormError> {
        let form = &application.form;
        let Some(first_id) = group.pages.first() else {
            return Ok(true);
        };
        let processor = PageProcessor::new(self.registry);
        let extra_data = Some(ExtraData::item(index));
        let mut visited: HashSet<&str> = HashSet::new();
        let mut current = page(application, first_id)?;

        loop {
            if !visited.insert(current.id.as_str()) {
                warn!(
                    form_id = %form.id,
                    hub = %hub.id,
                    page_id = %current.id,
                    "repeating group cycles back on itself; treating item as complete"
                );
                return Ok(true);
            }
            if !processor.check(application, &current.id, extra_data)?.is_empty() {
                return Ok(false);
            }

            let Some(next) = self.transition(application, current, extra_data, false)? else {
                return Ok(true);
            };
            let stays_in_group = form
                .group_of(&next.page_id)
                .is_some_and(|(next_hub, _)| next_hub.id == hub.id);
            if !stays_in_group {
                return Ok(true);
            }
            current = page(application, &next.page_id)?;
        }
    }

    fn transition(
        &self,
        application: &Application,
        page: &Page,
        extra_data: Option<ExtraData>,
        enter_groups: bool,
    ) -> Result<Option<PageLocation>, FormError> {
        let form = &application.form;
        if page.page_type.is_terminal() {
            return Ok(None);
        }

        if page.page_type == PageType::AddAnother {
            let group = page.group.as_ref().ok_or_else(|| {
                FormError::configuration(
                    &form.id,
                    ConfigurationError::MissingGroup {
                        page_id: page.id.clone(),
                    },
                )
            })?;
            if enter_groups {
                if let Some(index) = self.first_unfilled_item(application, page, group)? {
                    let first = group
                        .pages
                        .first()
                        .and_then(|member| form.page(member))
                        .ok_or_else(|| {
                            FormError::configuration(
                                &form.id,
                                ConfigurationError::MissingGroup {
                                    page_id: page.id.clone(),
                                },
                            )
                        })?;
                    return Ok(Some(PageLocation::of(first, Some(ExtraData::item(index)))));
                }
            }
        }

        let scope = scope_for(form, &application.answers, &page.id, extra_data)?;
        let ctx = application.answers.context(scope);
        let matched = first_match(&page.conditions, &ctx)
            .map_err(|source| FormError::configuration(&form.id, source))?;

        let target_id = match (matched, page.next_page_id.as_deref()) {
            (Some(condition), _) => condition.next_page_id.as_str(),
            (None, Some(default)) => default,
            (None, None) => {
                return Err(FormError::configuration(
                    &form.id,
                    ConfigurationError::MissingNextPage {
                        page_id: page.id.clone(),
                    },
                ))
            }
        };
        let target = form.page(target_id).ok_or_else(|| {
            FormError::configuration(
                &form.id,
                ConfigurationError::UnknownTarget {
                    page_id: page.id.clone(),
                    target: target_id.to_string(),
                },
            )
        })?;

        let source_hub = form.group_of(&page.id).map(|(hub, _)| hub.id.as_str());
        let target_hub = form.group_of(&target.id).map(|(hub, _)| hub.id.as_str());
        let carried = if source_hub.is_some() && source_hub == target_hub {
            extra_data
        } else {
            None
        };
        Ok(Some(PageLocation::of(target, carried)))
    }
}

fn page<'a>(application: &'a Application, page_id: &str) -> Result<&'a Page, FormError> {
    application
        .form
        .page(page_id)
        .ok_or_else(|| FormError::page_not_found(&application.form.id, page_id))
}
