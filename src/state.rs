use std::collections::BTreeSet;
use std::fmt::Display;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::color::{ColorScheme, RegionColors};
use prefecture_explorer::config::AppConfig;
use prefecture_explorer::data::aggregate::{
    self, by_parent_region, BalancedRegion, GenderMismatch, RankInfo, RegionValidation, Summary,
};
use prefecture_explorer::data::cache::DatasetCache;
use prefecture_explorer::data::compare::{compare, Comparison};
use prefecture_explorer::data::export;
use prefecture_explorer::data::filter::{self, filtered_indices, GenderMajority, Selection};
use prefecture_explorer::data::loader::load_table;
use prefecture_explorer::data::model::{DivisionDataset, Position, RegionRecord};
use prefecture_explorer::data::table::Table;
use prefecture_explorer::store::{
    AuditEntry, DetectionLabel, NewTrendForm, TrendRow, TrendStore,
};

// ---------------------------------------------------------------------------
// Session: serializable UI state, updated by value
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Page {
    #[default]
    Overview,
    Regions,
    Compare,
    Trends,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Overview, Page::Regions, Page::Compare, Page::Trends];

    pub fn title(&self) -> &'static str {
        match self {
            Page::Overview => "Population Map",
            Page::Regions => "Regional Statistics",
            Page::Compare => "Upload & Compare",
            Page::Trends => "Detection Trends",
        }
    }
}

/// Value shown on the choropleth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Metric {
    #[default]
    Total,
    Male,
    Female,
    GenderRatio,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Total, Metric::Male, Metric::Female, Metric::GenderRatio];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Total => "Total population",
            Metric::Male => "Male population",
            Metric::Female => "Female population",
            Metric::GenderRatio => "Gender ratio (M per 100 F)",
        }
    }

    pub fn value(&self, record: &RegionRecord) -> f64 {
        match self {
            Metric::Total => record.total as f64,
            Metric::Male => record.male as f64,
            Metric::Female => record.female as f64,
            Metric::GenderRatio => record.gender_ratio(),
        }
    }
}

/// Modal dialog of the trends page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub enum Dialog {
    #[default]
    None,
    /// Relabel the listed trend rows.
    EditLabels { rows: Vec<usize>, label: DetectionLabel },
    NewRow(NewTrendForm),
    ConfirmDelete(Vec<usize>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Status {
    Info(String),
    Warning(String),
    Error(String),
}

/// Everything the user has chosen, independent of loaded data.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub page: Page,
    pub selection: Selection,
    pub metric: Metric,
    pub scheme: ColorScheme,
    pub search: String,
    /// Division whose rank is shown in the detail box.
    pub focus: Option<String>,
    /// Gender majority the finder on the regions page looks for.
    pub majority: GenderMajority,
    /// Selected rows of the trends table.
    pub selected_trends: BTreeSet<usize>,
    pub dialog: Dialog,
    pub status: Option<Status>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ShowPage(Page),
    Select(Selection),
    SetMetric(Metric),
    SetScheme(ColorScheme),
    Search(String),
    Focus(Option<String>),
    FindMajority(GenderMajority),
    ToggleTrend(usize),
    ClearTrendSelection,
    OpenDialog(Dialog),
    CloseDialog,
    SetStatus(Status),
    ClearStatus,
}

impl Session {
    /// Next session after `action`.
    pub fn apply(self, action: Action) -> Session {
        match action {
            Action::ShowPage(page) => Session {
                page,
                dialog: Dialog::None,
                status: None,
                ..self
            },
            Action::Select(selection) => Session { selection, ..self },
            Action::SetMetric(metric) => Session { metric, ..self },
            Action::SetScheme(scheme) => Session { scheme, ..self },
            Action::Search(search) => Session { search, ..self },
            Action::Focus(focus) => Session { focus, ..self },
            Action::FindMajority(majority) => Session { majority, ..self },
            Action::ToggleTrend(row) => {
                let mut selected_trends = self.selected_trends;
                if !selected_trends.remove(&row) {
                    selected_trends.insert(row);
                }
                Session {
                    selected_trends,
                    ..self
                }
            }
            Action::ClearTrendSelection => Session {
                selected_trends: BTreeSet::new(),
                ..self
            },
            Action::OpenDialog(dialog) => Session { dialog, ..self },
            Action::CloseDialog => Session {
                dialog: Dialog::None,
                ..self
            },
            Action::SetStatus(status) => Session {
                status: Some(status),
                ..self
            },
            Action::ClearStatus => Session {
                status: None,
                ..self
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// Session plus loaded data. Every fallible handler reports failures
/// through `session.status` instead of returning them.
pub struct AppState {
    pub config: AppConfig,
    pub session: Session,

    cache: DatasetCache,
    /// Boundary dataset (None until a load succeeds).
    pub dataset: Option<Arc<DivisionDataset>>,
    /// Indices of divisions passing the current selection.
    pub visible_indices: Vec<usize>,
    /// Fill triangles per division, parallel to `dataset.divisions`.
    pub division_fills: Vec<Vec<[Position; 3]>>,
    pub region_colors: RegionColors,

    /// Renamed, column-filtered upload.
    pub upload: Option<Table>,
    pub upload_source: Option<PathBuf>,
    pub reference: Option<Table>,
    pub comparison: Option<Comparison>,

    pub store: Option<TrendStore>,
    pub trends: Vec<TrendRow>,
    pub audit_log: Vec<AuditEntry>,
}

impl AppState {
    /// Build the state and open the configured trend store. A store that
    /// fails to open leaves the trend pages empty with an error status.
    pub fn new(config: AppConfig) -> Self {
        let store = match TrendStore::open(&config.database_path) {
            Ok(store) => Some(store),
            Err(e) => {
                log::error!("Failed to open trend store: {e}");
                None
            }
        };
        let mut state = Self::with_store(config, store);
        if state.store.is_none() {
            state.dispatch(Action::SetStatus(Status::Error(
                "Trend database unavailable".to_string(),
            )));
        }
        state
    }

    pub fn with_store(config: AppConfig, store: Option<TrendStore>) -> Self {
        let cache = DatasetCache::new(config.fields.clone(), config.excluded_divisions.clone());
        let mut state = Self {
            config,
            session: Session::default(),
            cache,
            dataset: None,
            visible_indices: Vec::new(),
            division_fills: Vec::new(),
            region_colors: RegionColors::default(),
            upload: None,
            upload_source: None,
            reference: None,
            comparison: None,
            store,
            trends: Vec::new(),
            audit_log: Vec::new(),
        };
        state.refresh_trends();
        state.refresh_reference();
        state
    }

    /// Apply a session action, refiltering when the selection changed.
    pub fn dispatch(&mut self, action: Action) {
        let refilter = matches!(action, Action::Select(_));
        let session = std::mem::take(&mut self.session);
        self.session = session.apply(action);
        if refilter {
            self.refilter();
        }
    }

    fn report<T, E: Display>(&mut self, context: &str, result: Result<T, E>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("{context}: {e}");
                self.dispatch(Action::SetStatus(Status::Error(format!("{context}: {e}"))));
                None
            }
        }
    }

    fn info(&mut self, message: impl Into<String>) {
        self.dispatch(Action::SetStatus(Status::Info(message.into())));
    }

    // -----------------------------------------------------------------------
    // Boundary dataset
    // -----------------------------------------------------------------------

    pub fn load_configured_dataset(&mut self) {
        let path = self.config.boundaries_path.clone();
        self.load_dataset(&path);
    }

    pub fn load_dataset(&mut self, path: &Path) {
        let result = self.cache.get_or_load(path);
        let Some(dataset) = self.report("Failed to load dataset", result) else {
            return;
        };
        log::info!(
            "Showing {} divisions with {} regional totals",
            dataset.len(),
            dataset.region_totals.len()
        );
        self.region_colors = RegionColors::new(&dataset.parent_regions());
        self.division_fills = dataset
            .divisions
            .iter()
            .map(|r| r.geometry.triangulate())
            .collect();
        self.dataset = Some(dataset);
        self.refilter();
    }

    /// Drop the cached copy of the current source and read it again.
    pub fn reload_dataset(&mut self) {
        if let Some(ds) = &self.dataset {
            let path = ds.source.clone();
            self.cache.invalidate(&path);
            self.load_dataset(&path);
        }
    }

    /// Recompute `visible_indices` after a selection change.
    pub fn refilter(&mut self) {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(&ds.divisions, &self.session.selection);
        }
    }

    pub fn visible_records(&self) -> Vec<&RegionRecord> {
        match &self.dataset {
            Some(ds) => self
                .visible_indices
                .iter()
                .map(|&i| &ds.divisions[i])
                .collect(),
            None => Vec::new(),
        }
    }

    pub fn summary(&self) -> Summary {
        aggregate::summarize(self.visible_records())
    }

    pub fn group_summaries(&self) -> Vec<(String, Summary)> {
        aggregate::summarize_by_group(self.visible_records(), by_parent_region)
    }

    /// Official roll-ups against the computed sums of all their divisions,
    /// for every region that has a roll-up row.
    pub fn validations(&self) -> Vec<RegionValidation> {
        let Some(ds) = &self.dataset else {
            return Vec::new();
        };
        aggregate::summarize_by_group(&ds.divisions, by_parent_region)
            .iter()
            .filter_map(|(region, computed)| {
                ds.official_total(region)
                    .map(|official| aggregate::validate_region(official, computed))
            })
            .collect()
    }

    /// Visible regions closest to gender parity.
    pub fn most_balanced_region(&self) -> Option<BalancedRegion> {
        aggregate::most_balanced_region(&self.group_summaries())
    }

    /// All divisions with the gender majority chosen in the finder.
    pub fn majority_matches(&self) -> Vec<&RegionRecord> {
        match &self.dataset {
            Some(ds) => filter::gender_majority(&ds.divisions, self.session.majority),
            None => Vec::new(),
        }
    }

    /// Mean total over every division.
    pub fn national_average(&self) -> f64 {
        self.dataset
            .as_ref()
            .map_or(0.0, |ds| aggregate::summarize(&ds.divisions).mean_total)
    }

    pub fn gender_mismatches(&self) -> Vec<GenderMismatch> {
        match &self.dataset {
            Some(ds) => aggregate::gender_mismatches(&ds.divisions),
            None => Vec::new(),
        }
    }

    /// Rank of the focused division among all divisions.
    pub fn focused_rank(&self) -> Option<(&RegionRecord, RankInfo)> {
        let ds = self.dataset.as_ref()?;
        let name = self.session.focus.as_deref()?;
        let record = ds.divisions.iter().find(|r| r.name == name)?;
        Some((record, aggregate::rank(&ds.divisions, record)))
    }

    // -----------------------------------------------------------------------
    // Upload comparison
    // -----------------------------------------------------------------------

    pub fn load_upload(&mut self, path: &Path) {
        let result = load_table(path);
        let Some(raw) = self.report("Error reading file", result) else {
            self.upload = None;
            self.comparison = None;
            return;
        };
        let table = raw
            .rename_columns(&self.config.upload_rename)
            .select_existing(&self.config.upload_columns);
        log::info!("Uploaded {} rows from {}", table.len(), path.display());
        self.upload = Some(table);
        self.upload_source = Some(path.to_path_buf());
        self.info("File uploaded successfully.");
        self.refresh_comparison();
    }

    pub fn refresh_reference(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let result = store.fetch_reference_table();
        self.reference = self.report("Failed to fetch database trends", result);
    }

    /// Re-run the inner join of the upload against the reference table.
    pub fn refresh_comparison(&mut self) {
        let (Some(upload), Some(reference)) = (&self.upload, &self.reference) else {
            self.comparison = None;
            return;
        };
        let result = compare(upload, reference, &self.config.join_key_refs());
        self.comparison = self.report("Comparison failed", result);
    }

    // -----------------------------------------------------------------------
    // Trend CRUD
    // -----------------------------------------------------------------------

    pub fn refresh_trends(&mut self) {
        let Some(store) = &self.store else {
            return;
        };
        let trends = store.fetch_trends();
        let audit = store.fetch_audit_log();
        if let Some(trends) = self.report("Failed to fetch trends", trends) {
            self.trends = trends;
        }
        if let Some(audit) = self.report("Failed to fetch audit log", audit) {
            self.audit_log = audit;
        }
    }

    fn editable_store(&mut self) -> Option<&TrendStore> {
        if !self.config.user_can_edit {
            self.dispatch(Action::SetStatus(Status::Warning(
                "Editing is disabled".to_string(),
            )));
            return None;
        }
        if self.store.is_none() {
            self.dispatch(Action::SetStatus(Status::Error(
                "Trend database unavailable".to_string(),
            )));
        }
        self.store.as_ref()
    }

    /// Apply the open edit dialog, one transaction per row.
    pub fn submit_edit(&mut self) {
        let Dialog::EditLabels { rows, label } = self.session.dialog.clone() else {
            return;
        };
        let targets: Vec<TrendRow> = rows.iter().filter_map(|&i| self.trends.get(i).cloned()).collect();
        let Some(store) = self.editable_store() else {
            return;
        };
        let result: Result<Vec<TrendRow>, _> = targets
            .iter()
            .map(|row| store.update_label(row, label))
            .collect();
        self.finish_change("Failed to update rows", result);
    }

    /// Validate and insert the new-row form. Validation problems keep the
    /// dialog open with a warning.
    pub fn submit_new_row(&mut self) {
        let Dialog::NewRow(form) = self.session.dialog.clone() else {
            return;
        };
        let row = match form.validate() {
            Ok(row) => row,
            Err(warning) => {
                self.dispatch(Action::SetStatus(Status::Warning(warning.to_string())));
                return;
            }
        };
        let Some(store) = self.editable_store() else {
            return;
        };
        let result = store.insert_trend(&row);
        self.finish_change("Failed to add row", result);
    }

    pub fn confirm_delete(&mut self) {
        let Dialog::ConfirmDelete(rows) = self.session.dialog.clone() else {
            return;
        };
        let targets: Vec<TrendRow> = rows.iter().filter_map(|&i| self.trends.get(i).cloned()).collect();
        let Some(store) = self.editable_store() else {
            return;
        };
        let result = store.delete_trends(&targets);
        self.finish_change("Failed to delete rows", result);
    }

    fn finish_change<T, E: Display>(&mut self, context: &str, result: Result<T, E>) {
        let ok = self.report(context, result).is_some();
        self.refresh_trends();
        if ok {
            self.dispatch(Action::CloseDialog);
            self.dispatch(Action::ClearTrendSelection);
            self.info("Data successfully updated!");
        }
    }

    // -----------------------------------------------------------------------
    // Exports
    // -----------------------------------------------------------------------

    pub fn default_export_name(&self) -> String {
        export::export_file_name(&self.config.export_prefix, &self.session.selection)
    }

    pub fn export_divisions(&mut self, path: &Path) {
        let result = File::create(path)
            .map_err(Into::into)
            .and_then(|f| export::write_divisions_csv(f, self.visible_records()));
        self.finish_export(path, result);
    }

    pub fn export_group_summary(&mut self, path: &Path) {
        let groups = self.group_summaries();
        let result = File::create(path)
            .map_err(Into::into)
            .and_then(|f| export::write_group_summary_csv(f, &groups));
        self.finish_export(path, result);
    }

    pub fn export_ranked(&mut self, path: &Path) {
        let reference_total = self.dataset.as_ref().map_or(0, |ds| ds.grand_total());
        let records = self.visible_records();
        let rows = aggregate::ranked_table(&records, reference_total);
        let result = File::create(path)
            .map_err(Into::into)
            .and_then(|f| export::write_ranked_csv(f, &rows));
        self.finish_export(path, result);
    }

    pub fn export_comparison(&mut self, path: &Path) {
        let Some(comparison) = &self.comparison else {
            return;
        };
        let result = File::create(path)
            .map_err(Into::into)
            .and_then(|f| export::write_comparison_csv(f, comparison));
        self.finish_export(path, result);
    }

    fn finish_export(&mut self, path: &Path, result: prefecture_explorer::error::Result<()>) {
        if self.report("Export failed", result).is_some() {
            log::info!("Exported {}", path.display());
            self.info(format!("Saved {}", path.display()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use prefecture_explorer::store::ReferenceTrend;

    const DATASET: &str = r#"{"type":"FeatureCollection","features":[
        {"type":"Feature","geometry":null,
         "properties":{"prefecture":"A","Region":"R1","Ensemble":100,"Masculin":60,"Feminin":40}},
        {"type":"Feature","geometry":null,
         "properties":{"prefecture":"B","Region":"R2","Ensemble":200,"Masculin":90,"Feminin":110}},
        {"type":"Feature","geometry":null,
         "properties":{"prefecture":"C","Region":"R1","Ensemble":50,"Masculin":20,"Feminin":30}},
        {"type":"Feature","geometry":null,
         "properties":{"prefecture":null,"Region":"R1","Ensemble":151,"Masculin":80,"Feminin":71}}]}"#;

    fn state_with_store() -> AppState {
        let store = TrendStore::in_memory().unwrap();
        AppState::with_store(AppConfig::default(), Some(store))
    }

    fn loaded(dir: &tempfile::TempDir) -> AppState {
        let path = dir.path().join("pop.geojson");
        std::fs::write(&path, DATASET).unwrap();
        let mut state = state_with_store();
        state.load_dataset(&path);
        state
    }

    #[test]
    fn session_transitions_are_by_value() {
        let before = Session::default();
        let after = before
            .clone()
            .apply(Action::ShowPage(Page::Trends))
            .apply(Action::ToggleTrend(3))
            .apply(Action::ToggleTrend(5))
            .apply(Action::ToggleTrend(3));
        assert_eq!(before.page, Page::Overview);
        assert_eq!(after.page, Page::Trends);
        assert_eq!(after.selected_trends.into_iter().collect::<Vec<_>>(), vec![5]);
    }

    #[test]
    fn changing_page_closes_dialog() {
        let session = Session::default()
            .apply(Action::OpenDialog(Dialog::ConfirmDelete(vec![0])))
            .apply(Action::ShowPage(Page::Compare));
        assert_eq!(session.dialog, Dialog::None);
    }

    #[test]
    fn session_serializes() {
        let session = Session::default()
            .apply(Action::Select(Selection::ByParentRegion("KARA".into())))
            .apply(Action::OpenDialog(Dialog::NewRow(NewTrendForm::default())));
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }

    #[test]
    fn selection_refilters_visible_divisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        assert_eq!(state.visible_indices.len(), 3);

        state.dispatch(Action::Select(Selection::ByValueRange { min: 60, max: 150 }));
        let summary = state.summary();
        assert_eq!(summary.sum_total, 100);
        assert_eq!(summary.male_female_ratio, 150.0);
        assert_eq!(state.default_export_name(), "prefecture_60_150_population.csv");
    }

    #[test]
    fn validations_compare_rollups() {
        let dir = tempfile::tempdir().unwrap();
        let state = loaded(&dir);
        let validations = state.validations();
        assert_eq!(validations.len(), 1);
        assert_eq!(validations[0].computed_total, 150);
        assert_eq!(validations[0].difference, 1);
        assert!(state.gender_mismatches().is_empty());
    }

    #[test]
    fn regional_insights() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        assert_eq!(state.division_fills.len(), 3);

        let balanced = state.most_balanced_region().unwrap();
        assert_eq!(balanced.region, "R1");
        assert_eq!(balanced.difference, 10);

        let names = |state: &AppState| -> Vec<String> {
            state.majority_matches().iter().map(|r| r.name.clone()).collect()
        };
        assert_eq!(names(&state), vec!["A"]);
        state.dispatch(Action::FindMajority(GenderMajority::MoreFemales));
        assert_eq!(names(&state), vec!["B", "C"]);
        state.dispatch(Action::FindMajority(GenderMajority::Balanced));
        assert!(names(&state).is_empty());
        assert_eq!(state.national_average(), 350.0 / 3.0);
    }

    #[test]
    fn missing_dataset_sets_error_status() {
        let mut state = state_with_store();
        state.load_dataset(Path::new("/nonexistent/pop.geojson"));
        assert!(state.dataset.is_none());
        assert!(matches!(state.session.status, Some(Status::Error(_))));
    }

    #[test]
    fn upload_is_renamed_and_compared() {
        let store = TrendStore::in_memory().unwrap();
        store
            .replace_reference_trends(&[ReferenceTrend {
                location: "X".into(),
                measure: "flu".into(),
                latest_level: "5".into(),
                viral_activity_level: "Low".into(),
                latest_trends: "Up".into(),
            }])
            .unwrap();
        let mut state = AppState::with_store(AppConfig::default(), Some(store));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("upload.csv");
        std::fs::write(&path, "Location,Assay,Intensity,Trend,Extra\nX,flu,7,Up,z\nY,flu,1,Down,z\n")
            .unwrap();
        state.load_upload(&path);

        let upload = state.upload.as_ref().unwrap();
        assert_eq!(upload.columns, vec!["Location", "measure", "latestTrends", "LatestLevel"]);
        let cmp = state.comparison.as_ref().unwrap();
        assert_eq!(cmp.len(), 1);
        let level = cmp.paired_fields.iter().position(|f| f == "LatestLevel").unwrap();
        assert!(cmp.rows[0].differs[level]);
    }

    #[test]
    fn crud_round_trip_through_dialogs() {
        let mut state = state_with_store();
        let form = NewTrendForm {
            location: Some("Toronto".into()),
            epi_year: Some(2025),
            epi_week: Some(3),
            week_start: NaiveDate::from_ymd_opt(2025, 1, 12),
            label: Some(DetectionLabel::NoDetection),
        };

        state.dispatch(Action::OpenDialog(Dialog::NewRow(NewTrendForm::default())));
        state.submit_new_row();
        assert!(matches!(state.session.status, Some(Status::Warning(_))));
        assert!(state.trends.is_empty());

        state.dispatch(Action::OpenDialog(Dialog::NewRow(form)));
        state.submit_new_row();
        assert_eq!(state.trends.len(), 1);
        assert_eq!(state.session.dialog, Dialog::None);

        state.dispatch(Action::OpenDialog(Dialog::EditLabels {
            rows: vec![0],
            label: DetectionLabel::Consistent,
        }));
        state.submit_edit();
        assert_eq!(state.trends[0].label, DetectionLabel::Consistent);

        state.dispatch(Action::OpenDialog(Dialog::ConfirmDelete(vec![0])));
        state.confirm_delete();
        assert!(state.trends.is_empty());
        assert_eq!(state.audit_log.len(), 3);
    }

    #[test]
    fn read_only_config_blocks_edits() {
        let config = AppConfig {
            user_can_edit: false,
            ..AppConfig::default()
        };
        let mut state = AppState::with_store(config, Some(TrendStore::in_memory().unwrap()));
        state.dispatch(Action::OpenDialog(Dialog::NewRow(NewTrendForm {
            location: Some("Regina".into()),
            epi_year: Some(2025),
            epi_week: Some(1),
            week_start: NaiveDate::from_ymd_opt(2025, 1, 1),
            label: Some(DetectionLabel::NoRecentData),
        })));
        state.submit_new_row();
        assert!(state.trends.is_empty());
        assert!(matches!(state.session.status, Some(Status::Warning(_))));
    }

    #[test]
    fn export_writes_visible_divisions() {
        let dir = tempfile::tempdir().unwrap();
        let mut state = loaded(&dir);
        state.dispatch(Action::Select(Selection::ByParentRegion("R1".into())));
        let out = dir.path().join("out.csv");
        state.export_divisions(&out);
        let text = std::fs::read_to_string(&out).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(matches!(state.session.status, Some(Status::Info(_))));
    }
}
