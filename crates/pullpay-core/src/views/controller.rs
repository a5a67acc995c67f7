use std::sync::Arc;

use tracing::debug;

use super::{FetchSpec, Page, ViewDataLoader, ViewOutcome, paginate};
use crate::api::{ApiClient, ClientOptions, FetchResult, paths};
use crate::auth::Auth;
use crate::config::Config;
use crate::models::{Amount, Church, Transaction, UserProfile, total_amount};
use crate::mutation::{CreateTransaction, MutationSubmitter, Shared, UpdateProfile, lock, shared};
use crate::session::{GuardDecision, SessionGuard, TokenStore};

const TRANSACTIONS: &str = "transactions";
const CHURCHES: &str = "churches";

/// Data behind the transactions view.
///
/// The full collection sits behind a shared handle so a create submitter can
/// patch it in place. Pages and totals are derived from it on every call.
#[derive(Debug, Clone)]
pub struct TransactionsView {
    transactions: Shared<Vec<Transaction>>,
    page_size: usize,
    page_number: usize,
    /// Choices for the create form.
    pub churches: Vec<Church>,
}

impl TransactionsView {
    pub fn new(
        transactions: Vec<Transaction>,
        churches: Vec<Church>,
        page_size: usize,
        page_number: usize,
    ) -> Self {
        Self {
            transactions: shared(transactions),
            page_size: page_size.max(1),
            page_number,
            churches,
        }
    }

    pub fn transactions(&self) -> &Shared<Vec<Transaction>> {
        &self.transactions
    }

    /// Snapshot of the whole collection, newest first.
    pub fn snapshot(&self) -> Vec<Transaction> {
        lock(&self.transactions).clone()
    }

    /// The page that was requested, clamped to the current collection.
    pub fn page(&self) -> Page<Transaction> {
        self.page_at(self.page_number)
    }

    pub fn page_at(&self, page_number: usize) -> Page<Transaction> {
        paginate(&lock(&self.transactions), self.page_size, page_number)
    }

    /// Sum over all transactions, not only the current page.
    pub fn total_amount(&self) -> Amount {
        total_amount(&lock(&self.transactions))
    }

    pub fn count(&self) -> usize {
        lock(&self.transactions).len()
    }
}

/// Entry point for each dashboard view.
///
/// Every `load_*` call checks the session first and never touches the
/// network without one.
#[derive(Debug, Clone)]
pub struct Dashboard {
    loader: ViewDataLoader,
    guard: SessionGuard,
    page_size: usize,
}

impl Dashboard {
    pub fn new(client: ApiClient) -> Self {
        let guard = SessionGuard::new(client.tokens().clone());
        Self {
            loader: ViewDataLoader::new(client),
            guard,
            page_size: Config::DEFAULT_PAGE_SIZE,
        }
    }

    /// Builds a dashboard from config, honouring `PULLPAY_BASE_URL`.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be built.
    pub fn from_config(config: &Config, tokens: TokenStore) -> anyhow::Result<Self> {
        let client = ApiClient::new(ClientOptions::from_config(config)?, tokens)?;
        Ok(Self::new(client).with_page_size(config.effective_page_size()))
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn client(&self) -> &ApiClient {
        self.loader.client()
    }

    pub fn guard(&self) -> &SessionGuard {
        &self.guard
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn auth(&self) -> Auth {
        Auth::new(self.client().clone())
    }

    /// Landing view: the signed-in donor and their churches.
    pub async fn load_overview(&self) -> ViewOutcome<UserProfile> {
        self.load_user().await
    }

    /// Profile view; the result is also the edit form's starting record.
    pub async fn load_profile(&self) -> ViewOutcome<UserProfile> {
        self.load_user().await
    }

    /// Transactions and churches are fetched together; the view fails as a
    /// whole if either fails.
    pub async fn load_transactions(&self, page: usize) -> ViewOutcome<TransactionsView> {
        if let GuardDecision::Redirect(route) = self.guard.enter() {
            return ViewOutcome::Redirect(route);
        }

        let specs = [
            FetchSpec::new(TRANSACTIONS, paths::TRANSACTIONS),
            FetchSpec::new(CHURCHES, paths::CHURCHES),
        ];
        let loaded = self.loader.load(&specs).await;

        let decoded: FetchResult<(Vec<Transaction>, Vec<Church>)> = loaded
            .decode(TRANSACTIONS)
            .and_then(|transactions| Ok((transactions, loaded.decode(CHURCHES)?)));

        self.guard
            .on_result(decoded)
            .map(|(transactions, churches)| self.transactions_view(transactions, churches, page))
    }

    pub async fn load_churches(&self) -> ViewOutcome<Vec<Church>> {
        if let GuardDecision::Redirect(route) = self.guard.enter() {
            return ViewOutcome::Redirect(route);
        }
        self.guard
            .on_result(self.client().get_json(paths::CHURCHES).await)
    }

    /// Submitter for the create-transaction form. It patches the view's own
    /// collection, so the view's pages and totals follow every commit.
    pub fn transaction_submitter(
        &self,
        view: &TransactionsView,
    ) -> MutationSubmitter<CreateTransaction> {
        MutationSubmitter::new(
            self.client().clone(),
            CreateTransaction::new(view.churches.clone()),
            Arc::clone(view.transactions()),
        )
    }

    /// Submitter for the profile edit form, replacing `profile` on success.
    pub fn profile_submitter(
        &self,
        profile: Shared<Option<UserProfile>>,
    ) -> MutationSubmitter<UpdateProfile> {
        MutationSubmitter::new(self.client().clone(), UpdateProfile, profile)
    }

    async fn load_user(&self) -> ViewOutcome<UserProfile> {
        if let GuardDecision::Redirect(route) = self.guard.enter() {
            return ViewOutcome::Redirect(route);
        }
        self.guard
            .on_result(self.client().get_json(paths::CURRENT_USER).await)
    }

    fn transactions_view(
        &self,
        transactions: Vec<Transaction>,
        churches: Vec<Church>,
        page: usize,
    ) -> TransactionsView {
        debug!(count = transactions.len(), page, "transactions loaded");
        TransactionsView::new(transactions, churches, self.page_size, page)
    }
}
