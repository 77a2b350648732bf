mod analyze_flow;
mod lifecycle;
mod overload;
