// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Refinement engine
//!
//! Given a list of apps and a set of required fields, the engine:
//!
//! 1. offers orphan apps to plugins for adoption;
//! 2. runs plugins batch by batch, one batch per distinct plugin order.
//!    Plugins of one batch are issued together and awaited together; a
//!    batch never starts before the previous one completed. Wildcards are
//!    resolved into fresh candidates during the batch and appended once it
//!    completes, so later batches refine the candidates too;
//! 3. runs review enrichment and resource rewriting concurrently;
//! 4. fails if any of the above reported a cancellation;
//! 5. drops wildcards that were left unresolved;
//! 6. refines addons, runtimes and related apps one level deep, with the
//!    satisfied flags stripped, all concurrently.
//!
//! Non-cancellation failures of individual plugins are logged and treated
//! as "no contribution".

use crate::capabilities::Capability;
use crate::odrs::ReviewProvider;
use crate::plugin::PluginContext;
use crate::registry::{app_is_valid, PluginEntry, PluginRegistry};
use crate::rewrite::ResourceRewriter;
use appcenter_core::{
    AppList, AppRef, PluginError, PluginResult, RefineFlags, RefineJobFlags, ReviewRefineFlags,
};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::sync::Arc;

/// Collects errors from concurrent operations.
///
/// Cancellation takes precedence; otherwise the first error is kept and
/// the rest are logged.
#[derive(Debug, Default)]
pub struct ErrorFold {
    error: Option<PluginError>,
}

impl ErrorFold {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, error: PluginError) {
        match &self.error {
            None => self.error = Some(error),
            Some(existing) if !existing.is_cancelled() && error.is_cancelled() => {
                tracing::debug!(error = %existing, "Additional error");
                self.error = Some(error);
            }
            Some(_) => {
                tracing::debug!(error = %error, "Additional error");
            }
        }
    }

    /// Keep cancellations, log and drop everything else
    pub fn add_swallowing(&mut self, what: &str, error: PluginError) {
        if error.is_cancelled() {
            self.add(error);
        } else {
            tracing::debug!(source = what, error = %error, "failed to refine apps");
        }
    }

    pub fn is_empty(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_result(self) -> PluginResult<()> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Drives plugins, auxiliary providers and recursion for one refine
#[derive(Clone)]
pub struct Refiner {
    registry: Arc<PluginRegistry>,
    reviews: Option<Arc<dyn ReviewProvider>>,
    rewriter: Option<Arc<dyn ResourceRewriter>>,
}

impl Refiner {
    pub fn new(registry: Arc<PluginRegistry>) -> Self {
        Self {
            registry,
            reviews: None,
            rewriter: None,
        }
    }

    pub fn with_review_provider(mut self, provider: Arc<dyn ReviewProvider>) -> Self {
        self.reviews = Some(provider);
        self
    }

    pub fn with_rewriter(mut self, rewriter: Arc<dyn ResourceRewriter>) -> Self {
        self.rewriter = Some(rewriter);
        self
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Refine a copy of `list`; the caller's list is never modified.
    ///
    /// With empty `flags` or an empty list the copy is returned as is.
    /// Otherwise, after refining, addons sharing their parent's default
    /// source are dropped, and the result is filtered: wildcards only with
    /// `DISABLE_FILTERING`, every invalid app otherwise.
    pub async fn run(
        &self,
        list: &AppList,
        job_flags: RefineJobFlags,
        flags: RefineFlags,
        ctx: &PluginContext,
    ) -> PluginResult<AppList> {
        let mut result = list.copy();
        if flags.is_empty() || result.is_empty() {
            tracing::debug!("no refine flags set for transaction or app list is empty");
            return Ok(result);
        }

        self.refine_internal(&mut result, job_flags, flags, ctx)
            .await?;

        remove_addons_sharing_source(&result);

        if job_flags.contains(RefineJobFlags::DISABLE_FILTERING) {
            result.filter(|app| !app.is_wildcard());
        } else {
            result.filter(|app| app_is_valid(app, flags));
        }
        Ok(result)
    }

    fn refine_internal<'a>(
        &'a self,
        list: &'a mut AppList,
        job_flags: RefineJobFlags,
        flags: RefineFlags,
        ctx: &'a PluginContext,
    ) -> BoxFuture<'a, PluginResult<()>> {
        async move {
            ctx.check_cancelled()?;
            self.registry.run_adopt(list);

            let mut errors = ErrorFold::new();
            for batch in self.batches() {
                if !errors.is_empty() {
                    break;
                }
                if let Err(e) = ctx.check_cancelled() {
                    errors.add(e);
                    break;
                }
                let candidates = self
                    .run_batch(&batch, list, job_flags, flags, ctx, &mut errors)
                    .await;
                for candidate in candidates {
                    list.add(candidate);
                }
            }

            if errors.is_empty() {
                self.run_auxiliary(list, flags, ctx, &mut errors).await;
            }
            errors.into_result()?;

            list.filter(|app| !app.is_wildcard());

            if flags.contains(RefineFlags::REVIEWS) {
                for app in list.iter() {
                    app.sort_reviews();
                }
            }

            self.recurse(list, job_flags, flags, ctx).await
        }
        .boxed()
    }

    /// Enabled refine-capable plugins grouped by order
    fn batches(&self) -> Vec<Vec<Arc<PluginEntry>>> {
        let mut batches: Vec<Vec<Arc<PluginEntry>>> = Vec::new();
        for entry in self.registry.get_plugins() {
            if !entry.is_enabled()
                || !(entry.has(Capability::Refine) || entry.has(Capability::RefineWildcard))
            {
                continue;
            }
            match batches.last_mut() {
                Some(batch) if batch[0].order() == entry.order() => batch.push(entry),
                _ => batches.push(vec![entry]),
            }
        }
        if batches.is_empty() {
            tracing::debug!("no plugin could handle refining apps");
        }
        batches
    }

    /// Run one order batch; returns wildcard replacements to append
    async fn run_batch(
        &self,
        batch: &[Arc<PluginEntry>],
        list: &AppList,
        job_flags: RefineJobFlags,
        flags: RefineFlags,
        ctx: &PluginContext,
        errors: &mut ErrorFold,
    ) -> Vec<AppRef> {
        let concrete: AppList = list.iter().filter(|a| !a.is_wildcard()).cloned().collect();
        let wildcards: Vec<AppRef> = list.iter().filter(|a| a.is_wildcard()).cloned().collect();

        let calls = batch.iter().map(|entry| {
            let concrete = &concrete;
            let wildcards = &wildcards;
            async move {
                let mut found = Vec::new();
                if entry.has(Capability::Refine) && !concrete.is_empty() {
                    if let Err(e) = entry.plugin().refine(concrete, job_flags, flags, ctx).await {
                        return (entry.name().to_string(), Err(e), found);
                    }
                }
                if entry.has(Capability::RefineWildcard) {
                    for wildcard in wildcards {
                        match resolve_wildcard(entry, wildcard, job_flags, flags, ctx).await {
                            Ok(mut candidates) => found.append(&mut candidates),
                            Err(e) => return (entry.name().to_string(), Err(e), found),
                        }
                    }
                }
                (entry.name().to_string(), Ok(()), found)
            }
        });

        let mut candidates = Vec::new();
        for (name, result, mut found) in join_all(calls).await {
            candidates.append(&mut found);
            if let Err(e) = result {
                errors.add_swallowing(&name, e);
            }
        }
        candidates
    }

    async fn run_auxiliary(
        &self,
        list: &AppList,
        flags: RefineFlags,
        ctx: &PluginContext,
        errors: &mut ErrorFold,
    ) {
        let review_flags = ReviewRefineFlags::from_refine(flags);
        let reviews = async {
            match &self.reviews {
                Some(provider) if !review_flags.is_empty() => {
                    provider.refine(list, review_flags, ctx).await
                }
                _ => Ok(()),
            }
        };
        let rewrite = async {
            match &self.rewriter {
                Some(rewriter) => rewriter.rewrite(list, ctx).await,
                None => Ok(()),
            }
        };

        let (reviews, rewrite) = futures::join!(reviews, rewrite);
        if let Err(e) = reviews {
            errors.add_swallowing("review provider", e);
        }
        if let Err(e) = rewrite {
            errors.add_swallowing("resource rewriter", e);
        }
    }

    async fn recurse(
        &self,
        list: &AppList,
        job_flags: RefineJobFlags,
        flags: RefineFlags,
        ctx: &PluginContext,
    ) -> PluginResult<()> {
        let mut sub_lists: Vec<(AppList, RefineFlags)> = Vec::new();

        if flags.contains(RefineFlags::ADDONS) {
            let mut addons = AppList::new();
            for app in list {
                for addon in &app.addons() {
                    tracing::debug!(app = ?app.id(), addon = ?addon.id(), "refining addon");
                    addons.add(addon.clone());
                }
            }
            let addon_flags = flags
                .difference(RefineFlags::ADDONS | RefineFlags::REVIEWS | RefineFlags::REVIEW_RATINGS);
            sub_lists.push((addons, addon_flags));
        }

        if flags.contains(RefineFlags::RUNTIME) {
            let runtimes: AppList = list.iter().filter_map(|app| app.runtime()).collect();
            sub_lists.push((runtimes, flags.difference(RefineFlags::RUNTIME)));
        }

        if flags.contains(RefineFlags::RELATED) {
            let mut related = AppList::new();
            for app in list {
                for other in &app.related() {
                    tracing::debug!(related = ?other.id(), source = ?other.source_default(), "refining related");
                    related.add(other.clone());
                }
            }
            sub_lists.push((related, flags.difference(RefineFlags::RELATED)));
        }

        sub_lists.retain(|(sub, sub_flags)| !sub.is_empty() && !sub_flags.is_empty());
        if sub_lists.is_empty() {
            return Ok(());
        }
        ctx.check_cancelled()?;

        let recursions = sub_lists
            .iter_mut()
            .map(|(sub, sub_flags)| self.refine_internal(sub, job_flags, *sub_flags, ctx));

        let mut errors = ErrorFold::new();
        for result in join_all(recursions).await {
            if let Err(e) = result {
                errors.add_swallowing("recursive refine", e);
            }
        }
        errors.into_result()
    }
}

async fn resolve_wildcard(
    entry: &PluginEntry,
    wildcard: &AppRef,
    job_flags: RefineJobFlags,
    flags: RefineFlags,
    ctx: &PluginContext,
) -> PluginResult<Vec<AppRef>> {
    let candidates = entry.plugin().refine_wildcard(wildcard, flags, ctx).await?;
    let mut resolved = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        if Arc::ptr_eq(candidate, wildcard) || candidate.is_wildcard() {
            tracing::warn!(plugin = %entry.name(), "Wildcard resolved to a wildcard, ignoring");
            continue;
        }
        candidate.subsume_metadata(wildcard);
        if entry.has(Capability::Refine) {
            entry
                .plugin()
                .refine(&AppList::from_app(candidate.clone()), job_flags, flags, ctx)
                .await?;
        }
        tracing::debug!(
            plugin = %entry.name(),
            wildcard = ?wildcard.id(),
            app = %candidate.describe(),
            "resolved wildcard"
        );
        resolved.push(candidate.clone());
    }
    Ok(resolved)
}

/// Drop addons whose default source equals their parent's
fn remove_addons_sharing_source(list: &AppList) {
    for app in list {
        let Some(parent_source) = app.source_default() else {
            continue;
        };
        for addon in &app.addons() {
            if addon.source_default().as_deref() == Some(parent_source.as_str()) {
                tracing::debug!(
                    app = %app.describe(),
                    addon = %addon.describe(),
                    source = %parent_source,
                    "addon has the same source as its parent"
                );
                app.remove_addon(addon);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::CapabilitySet;
    use crate::plugin::Plugin;
    use appcenter_core::{App, AppKind, AppState};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use tokio_util::sync::CancellationToken;

    /// Records which apps it saw and with which flags
    struct Recorder {
        name: &'static str,
        order: i32,
        seen: Mutex<Vec<(String, RefineFlags)>>,
        fail_with: Option<PluginError>,
        wildcard_ids: Vec<&'static str>,
    }

    impl Recorder {
        fn new(name: &'static str, order: i32) -> Self {
            Self {
                name,
                order,
                seen: Mutex::new(Vec::new()),
                fail_with: None,
                wildcard_ids: Vec::new(),
            }
        }

        fn seen_ids(&self) -> Vec<String> {
            self.seen.lock().iter().map(|(id, _)| id.clone()).collect()
        }
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn order(&self) -> i32 {
            self.order
        }

        fn capabilities(&self) -> CapabilitySet {
            CapabilitySet::new()
                .with(Capability::Refine)
                .with(Capability::RefineWildcard)
        }

        async fn refine(
            &self,
            list: &AppList,
            _job_flags: RefineJobFlags,
            flags: RefineFlags,
            _ctx: &PluginContext,
        ) -> PluginResult<()> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            for app in list {
                assert!(!app.is_wildcard());
                self.seen
                    .lock()
                    .push((app.id().unwrap_or_default(), flags));
                if app.name().is_none() {
                    app.set_name(format!("name of {}", app.id().unwrap_or_default()));
                }
            }
            Ok(())
        }

        async fn refine_wildcard(
            &self,
            wildcard: &AppRef,
            _flags: RefineFlags,
            _ctx: &PluginContext,
        ) -> PluginResult<AppList> {
            let mut out = AppList::new();
            if wildcard.id().as_deref() == Some("zeus.desktop") {
                for origin in &self.wildcard_ids {
                    let app = App::new("zeus.desktop");
                    app.set_origin(*origin);
                    app.set_kind(AppKind::DesktopApp);
                    out.add(app);
                }
            }
            Ok(out)
        }
    }

    fn refiner(plugins: Vec<Arc<dyn Plugin>>) -> Refiner {
        let registry = Arc::new(PluginRegistry::new());
        for plugin in plugins {
            registry.register(plugin).unwrap();
        }
        Refiner::new(registry)
    }

    fn disable_filtering() -> RefineJobFlags {
        RefineJobFlags::DISABLE_FILTERING
    }

    #[tokio::test]
    async fn test_empty_flags_returns_copy() {
        let recorder = Arc::new(Recorder::new("recorder", 0));
        let refiner = refiner(vec![recorder.clone()]);
        let list = AppList::from_app(App::new("bare"));

        let out = refiner
            .run(&list, RefineJobFlags::empty(), RefineFlags::empty(), &PluginContext::detached())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert!(Arc::ptr_eq(out.index(0).unwrap(), list.index(0).unwrap()));
        assert!(recorder.seen_ids().is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_replaced_by_candidates() {
        let mut recorder = Recorder::new("recorder", 0);
        recorder.wildcard_ids = vec!["fedora", "flathub"];
        let recorder = Arc::new(recorder);
        let later = Arc::new(Recorder::new("later", 1));
        let refiner = refiner(vec![recorder.clone(), later.clone()]);

        let wildcard = App::new_wildcard("zeus.desktop", AppKind::DesktopApp);
        wildcard.set_metadata("Appcenter::origin-hint", "search");
        let mut list = AppList::new();
        list.add(App::new("chiron.desktop"));
        list.add(wildcard.clone());

        let out = refiner
            .run(&list, disable_filtering(), RefineFlags::ICON, &PluginContext::detached())
            .await
            .unwrap();

        assert_eq!(list.len(), 2);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|a| !a.is_wildcard()));
        assert!(!out.iter().any(|a| Arc::ptr_eq(a, &wildcard)));
        let resolved = out.lookup("*/*/flathub/zeus.desktop/*").unwrap();
        assert_eq!(resolved.metadata_item("Appcenter::origin-hint").as_deref(), Some("search"));
        assert_eq!(later.seen_ids().iter().filter(|id| *id == "zeus.desktop").count(), 2);
    }

    #[tokio::test]
    async fn test_unresolved_wildcard_dropped() {
        let refiner = refiner(vec![Arc::new(Recorder::new("recorder", 0))]);
        let list = AppList::from_app(App::new_wildcard("nothing.desktop", AppKind::DesktopApp));

        let out = refiner
            .run(&list, disable_filtering(), RefineFlags::ICON, &PluginContext::detached())
            .await
            .unwrap();
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_addons_refined_one_level() {
        let recorder = Arc::new(Recorder::new("recorder", 0));
        let refiner = refiner(vec![recorder.clone()]);

        let app = App::new("zeus.desktop");
        let addon = App::new("zeus-spell.addon");
        let nested = App::new("zeus-spell-extra.addon");
        addon.add_addon(&nested);
        app.add_addon(&addon);

        let flags = RefineFlags::ADDONS | RefineFlags::REVIEWS | RefineFlags::ICON;
        refiner
            .run(&AppList::from_app(app), disable_filtering(), flags, &PluginContext::detached())
            .await
            .unwrap();

        let seen = recorder.seen.lock().clone();
        assert_eq!(seen.len(), 2);
        let (_, addon_flags) = seen.iter().find(|(id, _)| id == "zeus-spell.addon").unwrap();
        assert!(!addon_flags.contains(RefineFlags::ADDONS));
        assert!(!addon_flags.contains(RefineFlags::REVIEWS));
        assert!(addon_flags.contains(RefineFlags::ICON));
        assert!(!seen.iter().any(|(id, _)| id == "zeus-spell-extra.addon"));
    }

    #[tokio::test]
    async fn test_non_cancel_errors_swallowed() {
        let mut failing = Recorder::new("failing", 0);
        failing.fail_with = Some(PluginError::Failed("backend exploded".to_string()));
        let ok = Arc::new(Recorder::new("ok", 0));
        let refiner = refiner(vec![Arc::new(failing), ok.clone()]);

        let out = refiner
            .run(
                &AppList::from_app(App::new("zeus.desktop")),
                disable_filtering(),
                RefineFlags::ICON,
                &PluginContext::detached(),
            )
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(ok.seen_ids(), vec!["zeus.desktop"]);
    }

    #[tokio::test]
    async fn test_cancellation_wins() {
        let mut failing = Recorder::new("failing", 0);
        failing.fail_with = Some(PluginError::Failed("backend exploded".to_string()));
        let mut cancelled = Recorder::new("cancelled", 0);
        cancelled.fail_with = Some(PluginError::cancelled());
        let later = Arc::new(Recorder::new("later", 1));
        let refiner = refiner(vec![Arc::new(failing), Arc::new(cancelled), later.clone()]);

        let err = refiner
            .run(
                &AppList::from_app(App::new("zeus.desktop")),
                disable_filtering(),
                RefineFlags::ICON,
                &PluginContext::detached(),
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(later.seen_ids().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_before_plugins() {
        let recorder = Arc::new(Recorder::new("recorder", 0));
        let refiner = refiner(vec![recorder.clone()]);
        let ctx = PluginContext::new(CancellationToken::new(), crate::events::EventSink::discard());
        ctx.cancellable().cancel();

        let err = refiner
            .run(
                &AppList::from_app(App::new("zeus.desktop")),
                disable_filtering(),
                RefineFlags::ICON,
                &ctx,
            )
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
        assert!(recorder.seen_ids().is_empty());
    }

    #[tokio::test]
    async fn test_addon_with_parent_source_removed() {
        let refiner = refiner(vec![Arc::new(Recorder::new("recorder", 0))]);
        let app = App::new("zeus.desktop");
        app.add_source("zeus");
        let same = App::new("zeus-data.addon");
        same.add_source("zeus");
        let other = App::new("zeus-spell.addon");
        other.add_source("zeus-spell");
        app.add_addon(&same);
        app.add_addon(&other);

        refiner
            .run(&AppList::from_app(app.clone()), disable_filtering(), RefineFlags::ADDONS, &PluginContext::detached())
            .await
            .unwrap();
        let addons = app.addons();
        assert_eq!(addons.len(), 1);
        assert_eq!(addons.index(0).unwrap().id().as_deref(), Some("zeus-spell.addon"));
    }

    #[tokio::test]
    async fn test_filtering_drops_invalid() {
        let refiner = refiner(vec![Arc::new(Recorder::new("recorder", 0))]);
        let valid = App::new("zeus.desktop");
        valid.set_kind(AppKind::DesktopApp);
        valid.set_state(AppState::Installed);
        valid.set_summary("Zeus");
        let mut list = AppList::new();
        list.add(valid);
        list.add(App::new("no-state.desktop"));

        let out = refiner
            .run(&list, RefineJobFlags::empty(), RefineFlags::LICENSE, &PluginContext::detached())
            .await
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.index(0).unwrap().id().as_deref(), Some("zeus.desktop"));
    }

    #[test]
    fn test_error_fold_precedence() {
        let mut fold = ErrorFold::new();
        fold.add(PluginError::Failed("first".to_string()));
        fold.add(PluginError::NoNetwork("second".to_string()));
        assert!(matches!(fold.into_result(), Err(PluginError::Failed(_))));

        let mut fold = ErrorFold::new();
        fold.add(PluginError::Failed("first".to_string()));
        fold.add(PluginError::cancelled());
        fold.add(PluginError::Failed("third".to_string()));
        assert!(fold.into_result().unwrap_err().is_cancelled());
    }
}
