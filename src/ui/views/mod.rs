mod branch_detail;
mod branch_list;

pub use branch_detail::BranchDetailView;
pub use branch_list::BranchListView;
